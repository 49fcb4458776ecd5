use hooklift_derive::hooklift_error;
use std::borrow::Cow;

#[hooklift_error]
pub enum GatedError {
    #[cfg(any())]
    #[error("Never compiled{}: {source}", format_context(.context))]
    Gated { source: std::fmt::Error, context: Option<Cow<'static, str>> },

    #[error("Plain{}: {message}", format_context(.context))]
    Plain { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn main() {
    let err = GatedError::Plain { message: "ok".into(), context: None };
    assert_eq!(err.to_string(), "Plain: ok");
}
