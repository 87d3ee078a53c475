mod common;

mod launcher;
mod routing;
