pub mod analysis;
pub mod escalation;
pub mod identity;

#[cfg(test)]
pub(crate) mod testing;
