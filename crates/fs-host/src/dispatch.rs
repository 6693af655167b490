//! The late-bound object model and the property/method helpers built on it.

use tracing::trace;

use crate::error::{DispatchError, DispatchResult};
use crate::variant::{ObjectRef, Variant};

/// Upper bound on items fetched from a collection that does not report `Count`.
const MAX_UNCOUNTED_ITEMS: i64 = 100_000;

/// An object exposed by the host automation surface.
///
/// Members are looked up by name at call time. Whether a member is a
/// property or a method, and which arguments it accepts, is not known ahead
/// of time and can differ between installations.
pub trait AutomationObject {
    /// Host-side type name, used in diagnostics.
    fn type_name(&self) -> &str;

    /// Read a property.
    fn get(&self, member: &str) -> DispatchResult<Variant>;

    /// Assign a property.
    fn put(&self, member: &str, value: Variant) -> DispatchResult<()>;

    /// Call a method. An empty `member` addresses the default member, which
    /// collections use for indexed access.
    fn invoke(&self, member: &str, args: &[Variant]) -> DispatchResult<Variant>;
}

fn prefer_informative(first: DispatchError, second: DispatchError) -> DispatchError {
    if matches!(first, DispatchError::UnknownMember { .. }) {
        second
    } else {
        first
    }
}

/// Read `member` as a property, falling back to a zero-argument call.
pub fn read(obj: &ObjectRef, member: &str) -> DispatchResult<Variant> {
    match obj.get(member) {
        Ok(v) => Ok(v),
        Err(first) => {
            trace!(member, error = %first, "property read failed, trying method form");
            obj.invoke(member, &[]).map_err(|second| prefer_informative(first, second))
        }
    }
}

/// Assign `member` as a property, falling back to a one-argument call.
pub fn write(obj: &ObjectRef, member: &str, value: Variant) -> DispatchResult<()> {
    match obj.put(member, value.clone()) {
        Ok(()) => Ok(()),
        Err(first) => {
            trace!(member, error = %first, "property write failed, trying method form");
            obj.invoke(member, &[value])
                .map(|_| ())
                .map_err(|second| prefer_informative(first, second))
        }
    }
}

pub fn read_f64(obj: &ObjectRef, member: &str) -> DispatchResult<f64> {
    let v = read(obj, member)?;
    v.as_f64().ok_or_else(|| DispatchError::TypeMismatch {
        member: member.to_string(),
        expected: "number",
        found: v.kind(),
    })
}

pub fn read_string(obj: &ObjectRef, member: &str) -> DispatchResult<String> {
    match read(obj, member)? {
        Variant::Str(s) => Ok(s),
        Variant::Empty => Ok(String::new()),
        other => Err(DispatchError::TypeMismatch {
            member: member.to_string(),
            expected: "string",
            found: other.kind(),
        }),
    }
}

/// Read a member that must yield a non-empty object.
pub fn read_object(obj: &ObjectRef, member: &str) -> DispatchResult<ObjectRef> {
    let v = read(obj, member)?;
    expect_object(member, v)
}

/// Call a method that must yield a non-empty object.
pub fn call_object(obj: &ObjectRef, member: &str, args: &[Variant]) -> DispatchResult<ObjectRef> {
    let v = obj.invoke(member, args)?;
    expect_object(member, v)
}

fn expect_object(member: &str, v: Variant) -> DispatchResult<ObjectRef> {
    let kind = v.kind();
    v.into_object().ok_or_else(|| DispatchError::TypeMismatch {
        member: member.to_string(),
        expected: "object",
        found: kind,
    })
}

/// Number of items a collection reports, if it reports one.
pub fn count(col: &ObjectRef) -> Option<i64> {
    read(col, "Count").ok().and_then(|v| v.as_i64())
}

/// Fetch item `index` (1-based) via `Item(i)` or the default member.
pub fn item(col: &ObjectRef, index: i64) -> DispatchResult<Variant> {
    let args = [Variant::Int(index)];
    match col.invoke("Item", &args) {
        Ok(v) => Ok(v),
        Err(first) => col
            .invoke("", &args)
            .map_err(|second| prefer_informative(first, second)),
    }
}

/// All object items of a collection.
///
/// Counted collections are read `1..=Count`; otherwise items are fetched until
/// the first failure. Non-object items are skipped.
pub fn items(col: &ObjectRef) -> Vec<ObjectRef> {
    let limit = count(col);
    let mut out = Vec::new();
    let mut index = 1;
    loop {
        if let Some(n) = limit
            && index > n
        {
            break;
        }
        if index > MAX_UNCOUNTED_ITEMS {
            break;
        }
        match item(col, index) {
            Ok(Variant::Object(o)) => out.push(o),
            Ok(_) => {}
            Err(err) => {
                if limit.is_some() {
                    trace!(index, error = %err, "collection item unavailable");
                    index += 1;
                    continue;
                }
                break;
            }
        }
        index += 1;
    }
    out
}

/// Case-insensitive name comparison used for every label lookup.
pub fn same_name(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Method-only object: every property access must go through `invoke`.
    struct MethodBag {
        values: RefCell<Vec<(String, Variant)>>,
    }

    impl AutomationObject for MethodBag {
        fn type_name(&self) -> &str {
            "MethodBag"
        }

        fn get(&self, member: &str) -> DispatchResult<Variant> {
            Err(DispatchError::unknown("MethodBag", member))
        }

        fn put(&self, member: &str, _value: Variant) -> DispatchResult<()> {
            Err(DispatchError::unknown("MethodBag", member))
        }

        fn invoke(&self, member: &str, args: &[Variant]) -> DispatchResult<Variant> {
            let mut values = self.values.borrow_mut();
            match args {
                [] => values
                    .iter()
                    .find(|(k, _)| k == member)
                    .map(|(_, v)| v.clone())
                    .ok_or_else(|| DispatchError::raised("MethodBag", member, "unset")),
                [v] => {
                    values.retain(|(k, _)| k != member);
                    values.push((member.to_string(), v.clone()));
                    Ok(Variant::Empty)
                }
                _ => Err(DispatchError::bad_args("MethodBag", member, "arity")),
            }
        }
    }

    /// Collection without `Count` that only answers to the default member.
    struct Uncounted(usize);

    impl AutomationObject for Uncounted {
        fn type_name(&self) -> &str {
            "Uncounted"
        }

        fn get(&self, member: &str) -> DispatchResult<Variant> {
            Err(DispatchError::unknown("Uncounted", member))
        }

        fn put(&self, member: &str, _value: Variant) -> DispatchResult<()> {
            Err(DispatchError::unknown("Uncounted", member))
        }

        fn invoke(&self, member: &str, args: &[Variant]) -> DispatchResult<Variant> {
            if !member.is_empty() {
                return Err(DispatchError::unknown("Uncounted", member));
            }
            let i = args.first().and_then(Variant::as_i64).unwrap_or(0);
            if i >= 1 && (i as usize) <= self.0 {
                let obj: ObjectRef = Rc::new(Uncounted(0));
                Ok(Variant::Object(obj))
            } else {
                Err(DispatchError::raised("Uncounted", "", "index out of range"))
            }
        }
    }

    #[test]
    fn read_and_write_fall_back_to_method_form() {
        let bag: ObjectRef = Rc::new(MethodBag {
            values: RefCell::new(Vec::new()),
        });
        write(&bag, "Loading", Variant::Real(12.0)).unwrap();
        assert_eq!(read_f64(&bag, "Loading").unwrap(), 12.0);

        // The informative error is reported, not the property lookup miss
        let err = read(&bag, "Missing").unwrap_err();
        assert!(err.is_engine_failure());
    }

    #[test]
    fn uncounted_collection_reads_until_failure() {
        let col: ObjectRef = Rc::new(Uncounted(3));
        assert_eq!(items(&col).len(), 3);
    }

    #[test]
    fn names_compare_case_insensitively() {
        assert!(same_name("Bobine ", "bobine"));
        assert!(!same_name("bobine", "bobine2"));
    }
}
