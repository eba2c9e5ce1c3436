mod cancel;

#[doc(inline)]
pub use cancel::CancelToken;
