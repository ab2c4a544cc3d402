mod admm;

pub use admm::AdmmConfig;
