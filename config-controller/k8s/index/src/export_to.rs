//! `exportTo` visibility.

use mesh_config_core::ConfigObject;

/// Returns true if an object defined in `defining_ns` with the given `exportTo` list is visible
/// from `target_ns`.
pub fn is_exported_to(export_to: &[String], defining_ns: &str, target_ns: &str) -> bool {
    if export_to.is_empty() {
        return true;
    }
    export_to.iter().any(|ns| match ns.as_str() {
        "*" => true,
        "." => defining_ns == target_ns,
        ns => ns == target_ns,
    })
}

/// Returns true if `obj` may be referenced from `namespace`.
///
/// Kinds without an `exportTo` field are visible everywhere.
pub fn is_visible(obj: &ConfigObject, namespace: &str) -> bool {
    match obj.export_to() {
        Some(export_to) => is_exported_to(export_to, &obj.namespace, namespace),
        None => true,
    }
}

/// Retains the objects visible from `namespace`, in their original order.
pub fn filter_export_to<'a>(
    namespace: &str,
    objects: impl IntoIterator<Item = &'a ConfigObject>,
) -> Vec<&'a ConfigObject> {
    objects
        .into_iter()
        .filter(|obj| is_visible(obj, namespace))
        .collect()
}
