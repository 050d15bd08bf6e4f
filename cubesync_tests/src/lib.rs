/*! # Cubesync Tests

Harness running several client apps against an in-process relay, and the end-to-end
scenarios built on it.
*/

pub mod stepper;

#[cfg(test)]
mod relay;
