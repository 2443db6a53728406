//! Image generation providers.

mod runware;

pub use runware::{
    RunwareFactory, RunwareModel, RunwareProvider, RunwareProviderBuilder, API_KEY_ENV, API_URL,
};
