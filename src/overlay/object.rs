//! The in-memory object model the overlay engine operates on.
//!
//! Mirrors the parts of a page object graph the spoofing core has to reason
//! about: dynamically keyed objects with full property descriptors (data or
//! accessor), a prototype chain, a constructor identity, and callables whose
//! self-description can be rebranded. Everything is single-threaded by design;
//! references are `Rc<RefCell<_>>`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::masker::Stringifier;

/// Shared reference to an object in the graph.
pub type ObjectRef = Rc<RefCell<VirtualObject>>;

/// Shared reference to a callable.
pub type FunctionRef = Rc<NativeFunction>;

/// Accessor read half. Free to side-effect; the overlay engine preserves it
/// verbatim for non-overridden keys.
pub type Getter = Rc<dyn Fn() -> Value>;

/// Accessor write half.
pub type Setter = Rc<dyn Fn(Value)>;

/// A value readable from the object graph.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Object(ObjectRef),
    Function(FunctionRef),
}

impl Value {
    /// Convenience constructor for string values.
    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(s.into())
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionRef> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Convert a JSON value (configuration overrides arrive as JSON) into a
    /// graph value. Arrays and maps become fresh objects.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                let arr = VirtualObject::new("Array");
                {
                    let mut obj = arr.borrow_mut();
                    for (i, item) in items.iter().enumerate() {
                        obj.set(&i.to_string(), Value::from_json(item));
                    }
                    obj.set("length", Value::Number(items.len() as f64));
                }
                Value::Object(arr)
            }
            serde_json::Value::Object(map) => {
                let plain = VirtualObject::new("Object");
                {
                    let mut obj = plain.borrow_mut();
                    for (key, item) in map {
                        obj.set(key, Value::from_json(item));
                    }
                }
                Value::Object(plain)
            }
        }
    }

    /// How the value describes itself when stringified, honoring masked
    /// sources and reported type tags.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Value::Str(s) => s.clone(),
            Value::Object(o) => o.borrow().to_display_string(),
            Value::Function(f) => f.to_display_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            // Reference identity, as in the object system being modeled.
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Object(o) => write!(f, "<{}>", o.borrow().constructor_name()),
            Value::Function(func) => write!(f, "<fn {}>", func.name()),
        }
    }
}

/// A full property descriptor: either a data slot or an accessor pair, plus
/// the three attribute flags. Copied verbatim by the overlay engine for every
/// non-overridden key.
#[derive(Clone)]
pub struct PropertyDescriptor {
    pub value: Option<Value>,
    pub get: Option<Getter>,
    pub set: Option<Setter>,
    pub writable: bool,
    pub enumerable: bool,
    pub configurable: bool,
}

impl PropertyDescriptor {
    /// Default data descriptor: writable, enumerable, configurable.
    pub fn data(value: Value) -> Self {
        Self {
            value: Some(value),
            get: None,
            set: None,
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    /// Non-writable, non-configurable data descriptor.
    pub fn read_only(value: Value) -> Self {
        Self {
            value: Some(value),
            get: None,
            set: None,
            writable: false,
            enumerable: true,
            configurable: false,
        }
    }

    /// Accessor descriptor.
    pub fn accessor(get: Option<Getter>, set: Option<Setter>) -> Self {
        Self {
            value: None,
            get,
            set,
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    pub fn non_enumerable(mut self) -> Self {
        self.enumerable = false;
        self
    }

    pub fn is_accessor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    /// Drop any getter/setter, leaving a plain data descriptor.
    pub fn strip_accessors(&mut self) {
        self.get = None;
        self.set = None;
    }

    /// Read through the descriptor, invoking the getter if present.
    pub fn read(&self) -> Value {
        if let Some(get) = &self.get {
            get()
        } else {
            self.value.clone().unwrap_or(Value::Undefined)
        }
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("value", &self.value)
            .field("accessor", &self.is_accessor())
            .field("writable", &self.writable)
            .field("enumerable", &self.enumerable)
            .field("configurable", &self.configurable)
            .finish()
    }
}

/// Capability interface the overlay engine requires from an object system:
/// enumerate own properties, inspect descriptors, install descriptors.
pub trait PropertyHost {
    /// Own property names in definition order.
    fn own_property_names(&self) -> Vec<String>;

    /// The own descriptor for `key`, if the property exists.
    fn own_descriptor(&self, key: &str) -> Option<PropertyDescriptor>;

    /// Install (or replace) the own descriptor for `key`.
    fn define_property(&mut self, key: &str, descriptor: PropertyDescriptor);

    /// Remove the own property `key`. Returns whether it existed.
    fn delete_property(&mut self, key: &str) -> bool;

    /// The object this one inherits from, if any.
    fn prototype(&self) -> Option<ObjectRef>;

    /// Reported constructor name, used for type probes.
    fn constructor_name(&self) -> String;
}

/// An object in the modeled page graph.
pub struct VirtualObject {
    prototype: Option<ObjectRef>,
    constructor_name: String,
    constructor: Option<FunctionRef>,
    properties: Vec<(String, PropertyDescriptor)>,
    string_tag: Option<Stringifier>,
}

impl VirtualObject {
    /// Fresh object with no prototype.
    pub fn new(constructor_name: &str) -> ObjectRef {
        Self::with_prototype(constructor_name, None)
    }

    /// Fresh object inheriting from `prototype`.
    pub fn with_prototype(constructor_name: &str, prototype: Option<ObjectRef>) -> ObjectRef {
        Rc::new(RefCell::new(VirtualObject {
            prototype,
            constructor_name: constructor_name.to_string(),
            constructor: None,
            properties: Vec::new(),
            string_tag: None,
        }))
    }

    /// Instantiate from a zero-argument constructor, as `new ctor()` would:
    /// the instance inherits from `prototype` and reports the constructor's
    /// name and identity.
    pub fn construct(ctor: &FunctionRef, prototype: ObjectRef) -> ObjectRef {
        Rc::new(RefCell::new(VirtualObject {
            prototype: Some(prototype),
            constructor_name: ctor.name(),
            constructor: Some(Rc::clone(ctor)),
            properties: Vec::new(),
            string_tag: None,
        }))
    }

    /// The constructor this object reports, if one was recorded.
    pub fn constructor(&self) -> Option<FunctionRef> {
        self.constructor.clone()
    }

    /// Attach a stringification tag (e.g. `[object PluginArray]`).
    pub fn set_string_tag(&mut self, tag: Stringifier) {
        self.string_tag = Some(tag);
    }

    pub fn string_tag(&self) -> Option<&Stringifier> {
        self.string_tag.as_ref()
    }

    /// Read an own property, walking accessors but not the prototype chain.
    pub fn get_own(&self, key: &str) -> Option<Value> {
        self.own_descriptor_ref(key).map(PropertyDescriptor::read)
    }

    /// Write `key`. Routes through an own setter when present, updates a data
    /// slot in place, or defines a fresh enumerable data property.
    pub fn set(&mut self, key: &str, value: Value) {
        if let Some((_, descriptor)) = self.properties.iter_mut().find(|(k, _)| k == key) {
            if let Some(set) = &descriptor.set {
                set(value);
            } else {
                descriptor.value = Some(value);
            }
            return;
        }
        self.properties.push((key.to_string(), PropertyDescriptor::data(value)));
    }

    /// How the object describes itself when stringified: the attached tag if
    /// one was set, otherwise the default `[object <Type>]` form.
    pub fn to_display_string(&self) -> String {
        match &self.string_tag {
            Some(tag) => tag.render(),
            None => format!("[object {}]", self.constructor_name),
        }
    }

    /// Number of links in the prototype chain above this object.
    pub fn prototype_chain_len(&self) -> usize {
        let mut len = 0;
        let mut cursor = self.prototype.clone();
        while let Some(proto) = cursor {
            len += 1;
            cursor = proto.borrow().prototype();
        }
        len
    }

    /// Whether `candidate` appears anywhere in this object's prototype chain.
    /// Stands in for `instanceof` against an ancestor type's prototype.
    pub fn has_prototype(&self, candidate: &ObjectRef) -> bool {
        let mut cursor = self.prototype.clone();
        while let Some(proto) = cursor {
            if Rc::ptr_eq(&proto, candidate) {
                return true;
            }
            cursor = proto.borrow().prototype();
        }
        false
    }

    fn own_descriptor_ref(&self, key: &str) -> Option<&PropertyDescriptor> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, d)| d)
    }
}

impl PropertyHost for VirtualObject {
    fn own_property_names(&self) -> Vec<String> {
        self.properties.iter().map(|(k, _)| k.clone()).collect()
    }

    fn own_descriptor(&self, key: &str) -> Option<PropertyDescriptor> {
        self.own_descriptor_ref(key).cloned()
    }

    fn define_property(&mut self, key: &str, descriptor: PropertyDescriptor) {
        if let Some((_, slot)) = self.properties.iter_mut().find(|(k, _)| k == key) {
            *slot = descriptor;
        } else {
            self.properties.push((key.to_string(), descriptor));
        }
    }

    fn delete_property(&mut self, key: &str) -> bool {
        let before = self.properties.len();
        self.properties.retain(|(k, _)| k != key);
        self.properties.len() != before
    }

    fn prototype(&self) -> Option<ObjectRef> {
        self.prototype.clone()
    }

    fn constructor_name(&self) -> String {
        self.constructor_name.clone()
    }
}

impl fmt::Debug for VirtualObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualObject")
            .field("constructor", &self.constructor_name)
            .field("keys", &self.own_property_names())
            .field("chain_len", &self.prototype_chain_len())
            .finish()
    }
}

/// Read `key` from `object`, walking the prototype chain and running any
/// accessor encountered, exactly as a property read on the page would.
pub fn get_property(object: &ObjectRef, key: &str) -> Value {
    let mut cursor = Some(Rc::clone(object));
    while let Some(current) = cursor {
        let next = {
            let borrowed = current.borrow();
            if let Some(descriptor) = borrowed.own_descriptor(key) {
                drop(borrowed);
                return descriptor.read();
            }
            borrowed.prototype()
        };
        cursor = next;
    }
    Value::Undefined
}

/// A callable in the modeled graph. Invocation behavior is a Rust closure;
/// the reported name and stringification source are mutable metadata so the
/// masker can rebrand the callable without touching its behavior.
pub struct NativeFunction {
    name: RefCell<String>,
    source: RefCell<Option<Stringifier>>,
    body: Rc<dyn Fn(&[Value]) -> Value>,
}

impl NativeFunction {
    pub fn new(name: &str, body: impl Fn(&[Value]) -> Value + 'static) -> FunctionRef {
        Rc::new(NativeFunction {
            name: RefCell::new(name.to_string()),
            source: RefCell::new(None),
            body: Rc::new(body),
        })
    }

    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    pub fn set_name(&self, name: &str) {
        *self.name.borrow_mut() = name.to_string();
    }

    pub fn call(&self, args: &[Value]) -> Value {
        (self.body)(args)
    }

    /// Replace the stringification source (the masking hook).
    pub fn set_source(&self, source: Stringifier) {
        *self.source.borrow_mut() = Some(source);
    }

    pub fn source(&self) -> Option<Stringifier> {
        self.source.borrow().clone()
    }

    /// Self-description on stringification. Unmasked functions expose their
    /// injected origin; masked ones render the pinned native form.
    pub fn to_display_string(&self) -> String {
        match &*self.source.borrow() {
            Some(source) => source.render(),
            None => format!("function {}() {{ ... }}", self.name.borrow()),
        }
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name.borrow())
    }
}
