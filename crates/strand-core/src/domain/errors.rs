//! Errors - with_annotation の失敗型
//!
//! サービス自身はエラーを作りません。唯一の失敗経路は内側の計算の失敗で、
//! それを捕捉した PropertyMap と組にして返します。

use std::error::Error;
use std::fmt;

use super::property_map::PropertyMap;

/// An inner computation's failure together with the annotations it made.
///
/// `error` is passed through untouched; `source()` points at it.
#[derive(Debug)]
pub struct Annotated<E> {
    pub error: E,
    pub annotations: PropertyMap,
}

impl<E> Annotated<E> {
    pub fn new(error: E, annotations: PropertyMap) -> Self {
        Self { error, annotations }
    }

    pub fn into_parts(self) -> (E, PropertyMap) {
        (self.error, self.annotations)
    }

    pub fn map_err<F, E2>(self, f: F) -> Annotated<E2>
    where
        F: FnOnce(E) -> E2,
    {
        Annotated {
            error: f(self.error),
            annotations: self.annotations,
        }
    }
}

impl<E: fmt::Display> fmt::Display for Annotated<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (annotations: {:?})", self.error, self.annotations.key_names())
    }
}

impl<E> Error for Annotated<E>
where
    E: Error + 'static,
{
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PropertyKey;

    #[derive(Debug, thiserror::Error, PartialEq)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn display_and_source_expose_the_inner_error() {
        let key = PropertyKey::counter("attempts");
        let err = Annotated::new(Boom, PropertyMap::empty().annotate(&key, 1));

        assert_eq!(err.to_string(), r#"boom (annotations: ["attempts"])"#);
        assert_eq!(err.source().map(|e| e.to_string()).as_deref(), Some("boom"));

        let (inner, map) = err.into_parts();
        assert_eq!(inner, Boom);
        assert_eq!(map.get(&key), 1);
    }

    #[test]
    fn map_err_keeps_the_annotations() {
        let key = PropertyKey::<Vec<&'static str>>::list("trail");
        let err = Annotated::new(Boom, PropertyMap::empty().annotate(&key, vec!["fetch", "parse"]));

        let mapped: Annotated<String> = err.map_err(|e| format!("wrapped: {e}"));

        assert_eq!(mapped.error, "wrapped: boom");
        assert_eq!(mapped.annotations.get(&key), vec!["fetch", "parse"]);
        assert_eq!(mapped.to_string(), r#"wrapped: boom (annotations: ["trail"])"#);
    }
}
