use actix_web::web;

use crate::modules::uploader::{handle, MediaStore};

pub fn configure<S>(cfg: &mut web::ServiceConfig)
where
    S: MediaStore + Send + Sync + 'static,
{
    cfg.service(web::resource("/file_upload").route(web::post().to(handle::upload_file::<S>)))
        .service(web::resource("/file_remove").route(web::post().to(handle::remove_file::<S>)))
        .service(web::resource("/file_download").route(web::get().to(handle::download_file::<S>)))
        .service(web::resource("/file_crop").route(web::post().to(handle::crop_file::<S>)));
}
