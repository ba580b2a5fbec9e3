//! Test fixture bundles, generated as WebAssembly text and assembled with
//! `wat`.

use serde_json::{Value, json};

/// What `<Type>.invoke` answers for an operation.
#[derive(Debug, Clone)]
pub enum Reply {
    /// A fixed JSON document.
    Json(Value),
    /// The raw argument bytes.
    Echo,
    /// An endless loop; only fuel stops it.
    Spin,
    /// Failure code -1.
    Fail,
}

/// How `<Type>.new` behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constructor {
    Ok,
    Missing,
    Trap,
    Negative,
}

#[derive(Debug, Clone)]
pub struct TypeSpec {
    name: String,
    constructor: Constructor,
    invoke: bool,
    capabilities: Vec<(String, String, String, Reply)>,
}

impl TypeSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            constructor: Constructor::Ok,
            invoke: true,
            capabilities: Vec::new(),
        }
    }

    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.constructor = constructor;
        self
    }

    pub fn without_invoke(mut self) -> Self {
        self.invoke = false;
        self
    }

    pub fn capability(mut self, name: &str, description: &str, operation: &str, reply: Reply) -> Self {
        self.capabilities.push((
            name.to_string(),
            description.to_string(),
            operation.to_string(),
            reply,
        ));
        self
    }
}

/// Assembles a bundle exporting the given provider types.
#[derive(Debug, Default)]
pub struct BundleBuilder {
    types: Vec<TypeSpec>,
    data: Vec<(u32, Vec<u8>)>,
    next_offset: u32,
}

const DATA_START: u32 = 1024;
const HEAP_START: u32 = 32 * 1024;

impl BundleBuilder {
    pub fn new() -> Self {
        Self {
            next_offset: DATA_START,
            ..Default::default()
        }
    }

    pub fn with_type(mut self, spec: TypeSpec) -> Self {
        self.types.push(spec);
        self
    }

    /// Place `bytes` in a data segment and return the packed slice for it.
    fn place(&mut self, bytes: Vec<u8>) -> (u32, u32, i64) {
        let offset = self.next_offset;
        let len = bytes.len() as u32;
        self.next_offset += len.max(1);
        assert!(self.next_offset < HEAP_START, "fixture data too large");
        self.data.push((offset, bytes));
        (offset, len, ((offset as i64) << 32) | len as i64)
    }

    pub fn build(mut self) -> Vec<u8> {
        wat::parse_str(self.to_wat()).expect("fixture bundle should assemble")
    }

    pub fn to_wat(&mut self) -> String {
        let mut funcs = String::new();

        for spec in std::mem::take(&mut self.types) {
            let listing: Vec<Value> = spec
                .capabilities
                .iter()
                .map(|(name, description, operation, _)| {
                    json!({"name": name, "description": description, "operation": operation})
                })
                .collect();
            let (_, _, packed) = self.place(serde_json::to_vec(&listing).unwrap());
            funcs.push_str(&format!(
                "  (func (export \"{}.capabilities\") (result i64) (i64.const {}))\n",
                spec.name, packed
            ));

            match spec.constructor {
                Constructor::Ok => funcs.push_str(&format!(
                    "  (func (export \"{}.new\") (result i32) (i32.const 1))\n",
                    spec.name
                )),
                Constructor::Trap => funcs.push_str(&format!(
                    "  (func (export \"{}.new\") (result i32) unreachable)\n",
                    spec.name
                )),
                Constructor::Negative => funcs.push_str(&format!(
                    "  (func (export \"{}.new\") (result i32) (i32.const -1))\n",
                    spec.name
                )),
                Constructor::Missing => {}
            }

            if !spec.invoke {
                continue;
            }
            let mut body = String::new();
            for (_, _, operation, reply) in &spec.capabilities {
                let (op_offset, op_len, _) = self.place(operation.as_bytes().to_vec());
                let action = match reply {
                    Reply::Json(value) => {
                        let (_, _, packed) = self.place(serde_json::to_vec(value).unwrap());
                        format!("(return (i64.const {packed}))")
                    }
                    Reply::Echo => "(return (i64.or (i64.shl (i64.extend_i32_u (local.get $args)) (i64.const 32)) (i64.extend_i32_u (local.get $args_len))))".to_string(),
                    Reply::Spin => "(loop $spin (br $spin))".to_string(),
                    Reply::Fail => "(return (i64.const -1))".to_string(),
                };
                body.push_str(&format!(
                    "    (if (call $eq (local.get $op) (local.get $op_len) (i32.const {op_offset}) (i32.const {op_len}))\n      (then {action}))\n"
                ));
            }
            funcs.push_str(&format!(
                "  (func (export \"{}.invoke\") (param $handle i32) (param $op i32) (param $op_len i32) (param $args i32) (param $args_len i32) (result i64)\n{}    (i64.const -2))\n",
                spec.name, body
            ));
        }

        let mut data = String::new();
        for (offset, bytes) in &self.data {
            let escaped: String = bytes.iter().map(|b| format!("\\{b:02x}")).collect();
            data.push_str(&format!("  (data (i32.const {offset}) \"{escaped}\")\n"));
        }

        format!(
            r#"(module
  (memory (export "memory") 1)
  (global $heap (mut i32) (i32.const {HEAP_START}))
  (func (export "alloc") (param $len i32) (result i32)
    (local $ptr i32)
    (local.set $ptr (global.get $heap))
    (global.set $heap (i32.add (global.get $heap) (local.get $len)))
    (local.get $ptr))
  (func $eq (param $a i32) (param $a_len i32) (param $b i32) (param $b_len i32) (result i32)
    (local $i i32)
    (if (i32.ne (local.get $a_len) (local.get $b_len))
      (then (return (i32.const 0))))
    (block $done
      (loop $next
        (br_if $done (i32.ge_u (local.get $i) (local.get $a_len)))
        (if (i32.ne
              (i32.load8_u (i32.add (local.get $a) (local.get $i)))
              (i32.load8_u (i32.add (local.get $b) (local.get $i))))
          (then (return (i32.const 0))))
        (local.set $i (i32.add (local.get $i) (i32.const 1)))
        (br $next)))
    (i32.const 1))
{funcs}{data})
"#
        )
    }
}

/// The two-capability greeter used across loader tests.
pub fn greeter_bundle() -> Vec<u8> {
    BundleBuilder::new()
        .with_type(
            TypeSpec::new("Greeter")
                .capability(
                    "helloWorld",
                    "Returns a friendly greeting",
                    "hello",
                    Reply::Json(json!("Hello, World!")),
                )
                .capability("greetUser", "Echoes the caller's arguments", "greet", Reply::Echo),
        )
        .build()
}

/// A bundle whose only candidate type has no zero-argument constructor.
pub fn constructorless_bundle() -> Vec<u8> {
    BundleBuilder::new()
        .with_type(
            TypeSpec::new("Stateful")
                .constructor(Constructor::Missing)
                .capability("count", "Counts", "count", Reply::Json(json!(1))),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_module_assembles() {
        let wat = BundleBuilder::new()
            .with_type(TypeSpec::new("A").capability("x", "", "x", Reply::Spin))
            .to_wat();
        assert!(wat.contains("\"A.invoke\""));
        assert!(wat::parse_str(&wat).is_ok());
    }

    #[test]
    fn test_type_without_invoke_omits_export() {
        let wat = BundleBuilder::new()
            .with_type(TypeSpec::new("B").without_invoke().capability("y", "", "y", Reply::Fail))
            .to_wat();
        assert!(!wat.contains("\"B.invoke\""));
        assert!(wat.contains("\"B.new\""));
    }
}
