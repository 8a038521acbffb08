pub use std::io::{Cursor, Error, Read, Write};
