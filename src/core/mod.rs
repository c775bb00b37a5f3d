use rand::distr::{Alphanumeric, SampleString};

pub mod chunk;

pub mod convert;

pub mod flatten;

pub mod item;

pub mod reconcile;

pub mod session;

pub mod stream;

/// Generates a random name consisting of alphanumeric characters.
///
/// # Returns
///
/// A `String` containing the generated random name.
fn build_name() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 8)
}
