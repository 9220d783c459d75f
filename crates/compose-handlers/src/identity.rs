//! Callback identity and deterministic keying.
//!
//! A [`Callback`] pairs a shared callable with its [`CallbackIdentity`]: an
//! optional name plus the callable's code shape. The code shape is the Rust
//! type name of the callable, which is unique per `fn` item and per closure
//! literal, so re-creating the same closure on every render yields the same
//! shape while still being a distinct value.

use std::any::{type_name, Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::mem;
use std::rc::Rc;

use serde::ser::{self, Serialize};

use crate::hash::fingerprint_hex;

/// Name and code shape of a source callback.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CallbackIdentity {
    name: Option<Cow<'static, str>>,
    shape: &'static str,
}

impl CallbackIdentity {
    fn of<F: 'static>() -> Self {
        let shape = type_name::<F>();
        Self {
            name: inferred_name(shape),
            shape,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn shape(&self) -> &'static str {
        self.shape
    }

    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }
}

impl fmt::Debug for CallbackIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackIdentity")
            .field("name", &self.name())
            .field("shape", &self.shape)
            .finish()
    }
}

// `fn` items print as their path, possibly with generic arguments. Closures,
// fn pointers, references and anything wrapping a trait object carry no name
// of their own.
fn inferred_name(shape: &'static str) -> Option<Cow<'static, str>> {
    if shape.contains("{{closure}}")
        || shape.contains("dyn ")
        || shape.starts_with('&')
        || shape.starts_with("fn(")
        || shape.starts_with("for<")
    {
        return None;
    }
    let path = shape.split('<').next().unwrap_or(shape);
    path.rsplit("::")
        .next()
        .filter(|segment| !segment.is_empty())
        .map(Cow::Borrowed)
}

/// A source callback handed to the `handle` / `update` factories.
///
/// Clones share the same allocation, so they count as the same callback.
pub struct Callback<F> {
    identity: CallbackIdentity,
    func: Rc<F>,
}

impl<F: 'static> Callback<F> {
    /// Wraps `func`, naming it after its path when it is a `fn` item.
    pub fn new(func: F) -> Self {
        Self {
            identity: CallbackIdentity::of::<F>(),
            func: Rc::new(func),
        }
    }

    /// Wraps `func` under an explicit name; the usual way to name a closure.
    pub fn named(name: impl Into<Cow<'static, str>>, func: F) -> Self {
        Self::new(func).with_name(name)
    }

    /// Wraps `func` without a name, even when one could be inferred.
    pub fn anonymous(func: F) -> Self {
        let mut callback = Self::new(func);
        callback.identity.name = None;
        callback
    }

    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.identity.name = Some(name.into());
        self
    }

    pub fn identity(&self) -> &CallbackIdentity {
        &self.identity
    }

    pub fn is_named(&self) -> bool {
        self.identity.is_named()
    }

    pub fn get(&self) -> &F {
        &self.func
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }

    pub(crate) fn source_ref(&self) -> SourceRef {
        // A capture-free callable has no state, so every value of its type
        // behaves the same and the type itself is the identity.
        if mem::size_of::<F>() == 0 {
            SourceRef::Stateless(TypeId::of::<F>())
        } else {
            SourceRef::Shared(Rc::clone(&self.func) as Rc<dyn Any>)
        }
    }
}

impl<F> Clone for Callback<F> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            func: Rc::clone(&self.func),
        }
    }
}

impl<F> fmt::Debug for Callback<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("identity", &self.identity)
            .field("ptr", &Rc::as_ptr(&self.func))
            .finish()
    }
}

/// Reference identity of the callback a cached handler was built from.
#[derive(Clone)]
pub(crate) enum SourceRef {
    Stateless(TypeId),
    Shared(Rc<dyn Any>),
}

impl SourceRef {
    pub(crate) fn same_as(&self, other: &SourceRef) -> bool {
        match (self, other) {
            (SourceRef::Stateless(a), SourceRef::Stateless(b)) => a == b,
            (SourceRef::Shared(a), SourceRef::Shared(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Deterministic string forms used to build cache keys.
pub trait IdentitySerializer {
    /// Deterministic string for an arbitrary value.
    fn stringify<P: Serialize + ?Sized>(&self, value: &P) -> Result<String, serde_json::Error>;

    /// Deterministic string for a callback's code identity, not its reference.
    fn stringify_function(&self, identity: &CallbackIdentity) -> String;
}

/// JSON for values, `name#shape-hash` for callbacks.
#[derive(Debug, Default, Clone, Copy)]
pub struct StableSerializer;

impl IdentitySerializer for StableSerializer {
    /// Fails for non-finite floats: JSON writes NaN and both infinities as
    /// `null`, so they could not be told apart in a key.
    fn stringify<P: Serialize + ?Sized>(&self, value: &P) -> Result<String, serde_json::Error> {
        value.serialize(FiniteCheck)?;
        serde_json::to_string(value)
    }

    fn stringify_function(&self, identity: &CallbackIdentity) -> String {
        format!(
            "{}#{}",
            identity.name().unwrap_or("<anonymous>"),
            fingerprint_hex(identity.shape())
        )
    }
}

// Walks a value without producing output, rejecting NaN and infinities.
#[derive(Clone, Copy)]
struct FiniteCheck;

type CheckResult = Result<(), serde_json::Error>;

fn finite(value: f64) -> CheckResult {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ser::Error::custom(format_args!(
            "non-finite float {value} has no distinct JSON form"
        )))
    }
}

impl ser::Serializer for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_bool(self, _: bool) -> CheckResult {
        Ok(())
    }
    fn serialize_i8(self, _: i8) -> CheckResult {
        Ok(())
    }
    fn serialize_i16(self, _: i16) -> CheckResult {
        Ok(())
    }
    fn serialize_i32(self, _: i32) -> CheckResult {
        Ok(())
    }
    fn serialize_i64(self, _: i64) -> CheckResult {
        Ok(())
    }
    fn serialize_i128(self, _: i128) -> CheckResult {
        Ok(())
    }
    fn serialize_u8(self, _: u8) -> CheckResult {
        Ok(())
    }
    fn serialize_u16(self, _: u16) -> CheckResult {
        Ok(())
    }
    fn serialize_u32(self, _: u32) -> CheckResult {
        Ok(())
    }
    fn serialize_u64(self, _: u64) -> CheckResult {
        Ok(())
    }
    fn serialize_u128(self, _: u128) -> CheckResult {
        Ok(())
    }
    fn serialize_f32(self, v: f32) -> CheckResult {
        finite(f64::from(v))
    }
    fn serialize_f64(self, v: f64) -> CheckResult {
        finite(v)
    }
    fn serialize_char(self, _: char) -> CheckResult {
        Ok(())
    }
    fn serialize_str(self, _: &str) -> CheckResult {
        Ok(())
    }
    fn serialize_bytes(self, _: &[u8]) -> CheckResult {
        Ok(())
    }
    fn serialize_none(self) -> CheckResult {
        Ok(())
    }
    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> CheckResult {
        value.serialize(self)
    }
    fn serialize_unit(self) -> CheckResult {
        Ok(())
    }
    fn serialize_unit_struct(self, _: &'static str) -> CheckResult {
        Ok(())
    }
    fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> CheckResult {
        Ok(())
    }
    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        value: &T,
    ) -> CheckResult {
        value.serialize(self)
    }
    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        value: &T,
    ) -> CheckResult {
        value.serialize(self)
    }
    fn serialize_seq(self, _: Option<usize>) -> Result<Self, serde_json::Error> {
        Ok(self)
    }
    fn serialize_tuple(self, _: usize) -> Result<Self, serde_json::Error> {
        Ok(self)
    }
    fn serialize_tuple_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> Result<Self, serde_json::Error> {
        Ok(self)
    }
    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self, serde_json::Error> {
        Ok(self)
    }
    fn serialize_map(self, _: Option<usize>) -> Result<Self, serde_json::Error> {
        Ok(self)
    }
    fn serialize_struct(self, _: &'static str, _: usize) -> Result<Self, serde_json::Error> {
        Ok(self)
    }
    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self, serde_json::Error> {
        Ok(self)
    }
}

impl ser::SerializeSeq for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;
    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> CheckResult {
        value.serialize(*self)
    }
    fn end(self) -> CheckResult {
        Ok(())
    }
}

impl ser::SerializeTuple for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;
    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> CheckResult {
        value.serialize(*self)
    }
    fn end(self) -> CheckResult {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;
    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> CheckResult {
        value.serialize(*self)
    }
    fn end(self) -> CheckResult {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;
    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> CheckResult {
        value.serialize(*self)
    }
    fn end(self) -> CheckResult {
        Ok(())
    }
}

impl ser::SerializeMap for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;
    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> CheckResult {
        key.serialize(*self)
    }
    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> CheckResult {
        value.serialize(*self)
    }
    fn end(self) -> CheckResult {
        Ok(())
    }
}

impl ser::SerializeStruct for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;
    fn serialize_field<T: Serialize + ?Sized>(&mut self, _: &'static str, value: &T) -> CheckResult {
        value.serialize(*self)
    }
    fn end(self) -> CheckResult {
        Ok(())
    }
}

impl ser::SerializeStructVariant for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;
    fn serialize_field<T: Serialize + ?Sized>(&mut self, _: &'static str, value: &T) -> CheckResult {
        value.serialize(*self)
    }
    fn end(self) -> CheckResult {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn increment(value: &i64) -> i64 {
        value + 1
    }

    #[test]
    fn fn_items_are_named_after_their_path() {
        let callback = Callback::new(increment);
        assert_eq!(callback.identity().name(), Some("increment"));
    }

    #[test]
    fn closures_are_anonymous_until_named() {
        let callback = Callback::new(|value: &i64| value * 2);
        assert!(!callback.is_named());
        assert!(callback.identity().shape().contains("{{closure}}"));

        let named = callback.with_name("double");
        assert_eq!(named.identity().name(), Some("double"));
    }

    fn echo<T: Clone>(value: &T) -> T {
        value.clone()
    }

    #[test]
    fn generic_fn_items_drop_their_arguments() {
        let callback = Callback::new(echo::<String>);
        assert_eq!(callback.identity().name(), Some("echo"));
    }

    #[test]
    fn boxed_trait_objects_and_fn_pointers_are_anonymous() {
        let boxed = Callback::new(Box::new(|value: &i64| value + 1) as Box<dyn Fn(&i64) -> i64>);
        assert!(!boxed.is_named());

        let pointer = Callback::new(increment as fn(&i64) -> i64);
        assert!(!pointer.is_named());
    }

    #[test]
    fn anonymous_drops_inferred_name() {
        assert!(!Callback::anonymous(increment).is_named());
    }

    #[test]
    fn clones_share_a_reference() {
        let make = |step: i64| Callback::named("add", move |value: &i64| value + step);
        let a = make(3);
        let b = a.clone();
        let c = make(3);
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
        assert!(a.source_ref().same_as(&b.source_ref()));
    }

    #[test]
    fn capture_free_callbacks_compare_by_type() {
        let a = Callback::new(increment);
        let b = Callback::new(increment);
        assert!(!a.ptr_eq(&b));
        assert!(a.source_ref().same_as(&b.source_ref()));
    }

    #[test]
    fn stable_serializer_is_deterministic() {
        let serializer = StableSerializer;
        let identity = Callback::new(increment).identity().clone();
        assert_eq!(
            serializer.stringify_function(&identity),
            serializer.stringify_function(&identity)
        );
        assert!(serializer
            .stringify_function(&identity)
            .starts_with("increment#"));
        assert_eq!(serializer.stringify(&(1, "a")).unwrap(), r#"[1,"a"]"#);
    }

    #[test]
    fn non_finite_floats_cannot_be_stringified() {
        let serializer = StableSerializer;
        assert!(serializer.stringify(&f64::NAN).is_err());
        assert!(serializer.stringify(&(1, f64::INFINITY)).is_err());
        assert!(serializer.stringify(&vec![Some(f32::NEG_INFINITY)]).is_err());
        assert_eq!(serializer.stringify(&(0.5f64, -2.0f32)).unwrap(), "[0.5,-2.0]");
    }
}
