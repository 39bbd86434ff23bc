pub mod handle;
pub mod imaging;
pub mod model;
pub mod naming;
pub mod repository;
pub mod repository_fs;
pub mod route;
pub mod schema;
pub mod service;

pub use model::UploaderConfig;
pub use repository::MediaStore;
pub use repository_fs::LocalMediaStore;
pub use service::UploaderService;
