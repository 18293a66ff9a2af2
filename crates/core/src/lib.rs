pub mod bag;
pub mod pipeline;
pub mod shared;
pub mod video;

#[cfg(test)]
mod testing;
