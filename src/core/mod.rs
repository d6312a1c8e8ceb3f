pub mod error;
pub mod event;
pub mod record;

#[cfg(test)]
mod tests;
