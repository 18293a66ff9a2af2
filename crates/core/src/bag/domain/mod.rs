pub mod bag_error;
pub mod bag_reader;
pub mod image_message;
