//! Conversion of handler return values into the shape the return-value
//! protocols interpret.
//!
//! Every handler return type implements [`IntoReturn`], producing an ordered
//! [`Returned`] list:
//!
//! | handler returns            | values                     |
//! |----------------------------|----------------------------|
//! | `()`                       | `[]`                       |
//! | `bool`                     | `[Bool]`                   |
//! | `String`, `&'static str`   | `[Text]`                   |
//! | `Vec<u8>`, `&'static [u8]` | `[Bytes]`                  |
//! | `Json<T>`                  | `[RawJson]`                |
//! | `Value`, maps              | `[Json]`                   |
//! | `(u16, B)`                 | `[Int, B]`                 |
//! | `Option<B>`, `Box<B>`      | the unwrapped body, `None` is JSON `null` |
//! | `Result<R, E>`             | `R`'s values, or abort the request on `Err` |

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use serde::Serialize;
use serde_json::Value;
use smallvec::{smallvec, SmallVec};

use crate::error::DispatchError;

/// Most handlers return at most a status and a body.
pub const MAX_INLINE_RETURNS: usize = 2;

/// A single value returned by a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnValue {
    Bool(bool),
    Int(i64),
    Text(String),
    Bytes(Vec<u8>),
    Json(Value),
    /// JSON already serialized, in the value's own field order.
    RawJson(Vec<u8>),
}

/// The ordered values a handler returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Returned(SmallVec<[ReturnValue; MAX_INLINE_RETURNS]>);

impl Returned {
    /// No values: the protocols pass through without writing.
    #[must_use]
    pub fn empty() -> Self {
        Returned(SmallVec::new())
    }

    #[must_use]
    pub fn one(value: ReturnValue) -> Self {
        Returned(smallvec![value])
    }

    #[must_use]
    pub fn pair(first: ReturnValue, second: ReturnValue) -> Self {
        Returned(smallvec![first, second])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[ReturnValue] {
        &self.0
    }

    pub(crate) fn into_values(self) -> SmallVec<[ReturnValue; MAX_INLINE_RETURNS]> {
        self.0
    }
}

impl FromIterator<ReturnValue> for Returned {
    fn from_iter<I: IntoIterator<Item = ReturnValue>>(iter: I) -> Self {
        Returned(iter.into_iter().collect())
    }
}

/// Wrapper that serializes its contents as the JSON body.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Json<T>(pub T);

/// A value usable as a response body.
pub trait IntoBody {
    fn into_body(self) -> Result<ReturnValue, DispatchError>;
}

/// A value a handler may return.
pub trait IntoReturn {
    fn into_return(self) -> Result<Returned, DispatchError>;
}

impl IntoBody for String {
    fn into_body(self) -> Result<ReturnValue, DispatchError> {
        Ok(ReturnValue::Text(self))
    }
}

impl IntoBody for &'static str {
    fn into_body(self) -> Result<ReturnValue, DispatchError> {
        Ok(ReturnValue::Text(self.to_string()))
    }
}

impl IntoBody for Cow<'static, str> {
    fn into_body(self) -> Result<ReturnValue, DispatchError> {
        Ok(ReturnValue::Text(self.into_owned()))
    }
}

impl IntoBody for Vec<u8> {
    fn into_body(self) -> Result<ReturnValue, DispatchError> {
        Ok(ReturnValue::Bytes(self))
    }
}

impl IntoBody for &'static [u8] {
    fn into_body(self) -> Result<ReturnValue, DispatchError> {
        Ok(ReturnValue::Bytes(self.to_vec()))
    }
}

impl IntoBody for Value {
    fn into_body(self) -> Result<ReturnValue, DispatchError> {
        Ok(ReturnValue::Json(self))
    }
}

impl<T: Serialize> IntoBody for Json<T> {
    fn into_body(self) -> Result<ReturnValue, DispatchError> {
        Ok(ReturnValue::RawJson(serde_json::to_vec(&self.0)?))
    }
}

impl<K: Serialize, V: Serialize, S: BuildHasher> IntoBody for HashMap<K, V, S> {
    fn into_body(self) -> Result<ReturnValue, DispatchError> {
        Ok(ReturnValue::Json(serde_json::to_value(&self)?))
    }
}

impl<K: Serialize, V: Serialize> IntoBody for BTreeMap<K, V> {
    fn into_body(self) -> Result<ReturnValue, DispatchError> {
        Ok(ReturnValue::Json(serde_json::to_value(&self)?))
    }
}

impl<B: IntoBody> IntoBody for Option<B> {
    fn into_body(self) -> Result<ReturnValue, DispatchError> {
        match self {
            Some(body) => body.into_body(),
            None => Ok(ReturnValue::Json(Value::Null)),
        }
    }
}

impl<B: IntoBody> IntoBody for Box<B> {
    fn into_body(self) -> Result<ReturnValue, DispatchError> {
        (*self).into_body()
    }
}

impl IntoReturn for () {
    fn into_return(self) -> Result<Returned, DispatchError> {
        Ok(Returned::empty())
    }
}

impl IntoReturn for bool {
    fn into_return(self) -> Result<Returned, DispatchError> {
        Ok(Returned::one(ReturnValue::Bool(self)))
    }
}

impl IntoReturn for Returned {
    fn into_return(self) -> Result<Returned, DispatchError> {
        Ok(self)
    }
}

macro_rules! body_returns {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl IntoReturn for $ty {
                fn into_return(self) -> Result<Returned, DispatchError> {
                    Ok(Returned::one(self.into_body()?))
                }
            }
        )+
    };
}

body_returns!(String, &'static str, Cow<'static, str>, Vec<u8>, &'static [u8], Value);

impl<T: Serialize> IntoReturn for Json<T> {
    fn into_return(self) -> Result<Returned, DispatchError> {
        Ok(Returned::one(self.into_body()?))
    }
}

impl<B: IntoBody> IntoReturn for Option<B> {
    fn into_return(self) -> Result<Returned, DispatchError> {
        Ok(Returned::one(self.into_body()?))
    }
}

impl<B: IntoBody> IntoReturn for Box<B> {
    fn into_return(self) -> Result<Returned, DispatchError> {
        Ok(Returned::one(self.into_body()?))
    }
}

impl<K: Serialize, V: Serialize, S: BuildHasher> IntoReturn for HashMap<K, V, S> {
    fn into_return(self) -> Result<Returned, DispatchError> {
        Ok(Returned::one(self.into_body()?))
    }
}

impl<K: Serialize, V: Serialize> IntoReturn for BTreeMap<K, V> {
    fn into_return(self) -> Result<Returned, DispatchError> {
        Ok(Returned::one(self.into_body()?))
    }
}

impl<B: IntoBody> IntoReturn for (u16, B) {
    fn into_return(self) -> Result<Returned, DispatchError> {
        Ok(Returned::pair(
            ReturnValue::Int(i64::from(self.0)),
            self.1.into_body()?,
        ))
    }
}

impl<B: IntoBody> IntoReturn for (http::StatusCode, B) {
    fn into_return(self) -> Result<Returned, DispatchError> {
        Ok(Returned::pair(
            ReturnValue::Int(i64::from(self.0.as_u16())),
            self.1.into_body()?,
        ))
    }
}

impl<R, E> IntoReturn for Result<R, E>
where
    R: IntoReturn,
    E: Into<DispatchError>,
{
    fn into_return(self) -> Result<Returned, DispatchError> {
        match self {
            Ok(values) => values.into_return(),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unit_and_bool() {
        assert!(().into_return().unwrap().is_empty());
        assert_eq!(
            false.into_return().unwrap().as_slice(),
            [ReturnValue::Bool(false)]
        );
    }

    #[test]
    fn test_status_and_map_body() {
        let mut body = HashMap::new();
        body.insert("id", "7");
        let values = (200u16, body).into_return().unwrap();
        assert_eq!(
            values.as_slice(),
            [ReturnValue::Int(200), ReturnValue::Json(json!({"id": "7"}))]
        );
    }

    #[test]
    fn test_json_keeps_field_order() {
        #[derive(Serialize)]
        struct User {
            name: &'static str,
            id: u32,
        }

        let values = Json(User { name: "ada", id: 7 }).into_return().unwrap();
        assert_eq!(
            values.as_slice(),
            [ReturnValue::RawJson(br#"{"name":"ada","id":7}"#.to_vec())]
        );
    }

    #[test]
    fn test_option_none_is_null() {
        let values = Option::<String>::None.into_return().unwrap();
        assert_eq!(values.as_slice(), [ReturnValue::Json(Value::Null)]);
    }

    #[test]
    fn test_boxed_text_is_unwrapped() {
        let values = Box::new(String::from("hi")).into_return().unwrap();
        assert_eq!(values.as_slice(), [ReturnValue::Text("hi".into())]);
    }

    #[test]
    fn test_non_string_map_keys_fail_to_serialize() {
        let mut body = HashMap::new();
        body.insert(vec![1u8], "x");
        let err = Json(body).into_return().unwrap_err();
        assert!(matches!(err, DispatchError::Serialize(_)));
    }

    #[test]
    fn test_result_error_aborts() {
        let res: Result<&'static str, anyhow::Error> = Err(anyhow::anyhow!("boom"));
        let err = res.into_return().unwrap_err();
        assert!(matches!(err, DispatchError::Handler(_)));
    }
}
