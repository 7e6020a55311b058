use super::*;

mod context;
mod properties;
mod resize;
