use hooklift_kernel::hook::HookError;
use std::borrow::Cow;

#[hooklift_derive::hooklift_error]
pub enum CorsError {
    /// Options that decode but make no sense together.
    #[error("CORS config error{}: {message}", format_context(.context))]
    Config { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal CORS error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl CorsError {
    pub(crate) fn config(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Config { message: message.into(), context: None }
    }
}

impl From<CorsError> for HookError {
    fn from(err: CorsError) -> Self {
        Self::failed(err.to_string())
    }
}
