pub mod material;
pub mod model;
pub mod textbank;
pub mod texture;
