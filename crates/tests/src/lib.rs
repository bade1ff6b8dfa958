pub mod fixtures;

#[cfg(test)]
mod upload_tests;
