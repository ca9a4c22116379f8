pub mod channel;
pub mod rdt;
pub mod sim;
pub mod viz;

#[cfg(test)]
mod test;
