//! Errors displayed to the operator: user-addressable mistakes are
//! distinguished from internal failures so the top level can choose how
//! sternly to word the message.

pub enum DisplayedError {
    UserError(String, Box<dyn std::fmt::Debug>),
    InternalError(String, Box<dyn std::fmt::Debug>),
}

impl std::fmt::Display for DisplayedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayedError::UserError(msg, e) => f.write_fmt(format_args!("{msg}: {e:?}")),
            DisplayedError::InternalError(msg, e) => f.write_fmt(format_args!("internal error - {msg}: {e:?}")),
        }
    }
}

#[inline]
pub fn user_error<E>(msg: impl Into<String>) -> impl FnOnce(E) -> DisplayedError
where
    E: std::fmt::Debug + 'static,
{
    move |e| DisplayedError::UserError(msg.into(), Box::new(e))
}

#[inline]
pub fn internal_error<E>(msg: impl Into<String>) -> impl FnOnce(E) -> DisplayedError
where
    E: std::fmt::Debug + 'static,
{
    move |e| DisplayedError::InternalError(msg.into(), Box::new(e))
}

pub trait DisplayableError {
    type T;
    fn user_error(self, msg: impl Into<String>) -> Result<Self::T, DisplayedError>;
    fn internal_error(self, msg: impl Into<String>) -> Result<Self::T, DisplayedError>;
}

impl<T, E: std::fmt::Debug + 'static> DisplayableError for Result<T, E> {
    type T = T;

    #[inline]
    fn user_error(self, msg: impl Into<String>) -> Result<Self::T, DisplayedError> {
        self.map_err(user_error(msg))
    }

    #[inline]
    fn internal_error(self, msg: impl Into<String>) -> Result<Self::T, DisplayedError> {
        self.map_err(internal_error(msg))
    }
}
