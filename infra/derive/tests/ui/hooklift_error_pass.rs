use hooklift_derive::hooklift_error;
use std::borrow::Cow;

#[hooklift_error]
pub enum DemoError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Rejected{}: {message}", format_context(.context))]
    Rejected { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn read() -> Result<(), DemoError> {
    let io: Result<(), std::io::Error> = Err(std::io::Error::other("disk"));
    io.context("reading hook manifest")
}

fn main() {
    let err = read().unwrap_err();
    assert_eq!(err.to_string(), "IO error (reading hook manifest): disk");

    let err: DemoError = "boom".into();
    assert_eq!(err.to_string(), "Internal error: boom");

    let rejected: Result<(), DemoError> =
        Err(DemoError::Rejected { message: "nope".into(), context: None });
    let err = rejected.context("allow-list").unwrap_err();
    assert_eq!(err.to_string(), "Rejected (allow-list): nope");
}
