use std::collections::HashMap;

pub const DEFAULT_BESTIARY: &str = "core";

pub fn builtin_bestiaries() -> HashMap<&'static str, &'static str> {
    HashMap::from([(DEFAULT_BESTIARY, include_str!("../content/bestiary.yaml"))])
}
