// Domain-layer modules and shared errors/models
pub mod lookup {
    pub use crate::lookup::*;
}

pub mod normalizer {
    pub use crate::normalizer::*;
}

pub mod extraction {
    pub use crate::balance::resolve_arrear;
    pub use crate::field_extractor::{best_effort, text_field, CustomerDocument};
    pub use crate::recharge::extract_recent;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
