//! # ErrorSlot 提取器
//!
//! 让普通的 axum 处理函数可以直接记录错误。

use std::convert::Infallible;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;

use super::ErrorSlot;
use crate::error::SlotError;

impl<S> FromRequestParts<S> for ErrorSlot
where
    S: Send + Sync,
{
    type Rejection = SlotError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_extensions(&parts.extensions).ok_or(SlotError::NotConfigured)
    }
}

impl<S> OptionalFromRequestParts<S> for ErrorSlot
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(Self::from_extensions(&parts.extensions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn make_parts(configured: bool) -> Parts {
        let mut request = Request::new(());
        if configured {
            ErrorSlot::install(request.extensions_mut());
        }
        request.into_parts().0
    }

    #[tokio::test]
    async fn test_extract_installed_slot() {
        let mut parts = make_parts(true);
        let slot = <ErrorSlot as FromRequestParts<()>>::from_request_parts(&mut parts, &())
            .await
            .expect("slot should be extracted");

        slot.store("extracted");
        assert_eq!(crate::slot::get(&parts).unwrap().to_string(), "extracted");
    }

    #[tokio::test]
    async fn test_extract_without_slot_rejects() {
        let mut parts = make_parts(false);
        let result = <ErrorSlot as FromRequestParts<()>>::from_request_parts(&mut parts, &()).await;

        assert_eq!(result.unwrap_err(), SlotError::NotConfigured);
    }

    #[tokio::test]
    async fn test_optional_extract() {
        let mut parts = make_parts(false);
        let missing =
            <ErrorSlot as OptionalFromRequestParts<()>>::from_request_parts(&mut parts, &()).await;
        assert!(matches!(missing, Ok(None)));

        let mut parts = make_parts(true);
        let present =
            <ErrorSlot as OptionalFromRequestParts<()>>::from_request_parts(&mut parts, &()).await;
        assert!(matches!(present, Ok(Some(_))));
    }
}
