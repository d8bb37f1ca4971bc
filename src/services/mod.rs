pub mod processor;
pub mod sweeper;
pub mod temp_upload;
pub mod upload_handler;
