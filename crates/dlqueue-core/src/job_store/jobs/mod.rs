//! Row operations on the `downloads` table, split into reads and writes.

mod read;
mod write;
