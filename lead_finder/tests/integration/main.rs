mod common;

mod export;
mod facilities;
mod jobs;
mod upload;
