use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("I/O failure")]
    IoFailure(#[from] io::Error),
    #[error("the node `{0}` is not laid out")]
    InvalidLayout(String),
}
