//! Small helpers for inspecting field types.

/// Extract the single generic argument of `Wrapper<T>` when the last path
/// segment is `wrapper`.
pub fn generic_inner<'a>(ty: &'a syn::Type, wrapper: &str) -> Option<&'a syn::Type> {
    if let syn::Type::Path(syn::TypePath { path, .. }) = ty {
        if let Some(seg) = path.segments.last() {
            if seg.ident == wrapper {
                if let syn::PathArguments::AngleBracketed(args) = &seg.arguments {
                    if let Some(syn::GenericArgument::Type(inner)) = args.args.first() {
                        return Some(inner);
                    }
                }
            }
        }
    }
    None
}

/// Extract the inner type from `Option<T>`.
pub fn option_inner_type(ty: &syn::Type) -> Option<&syn::Type> {
    generic_inner(ty, "Option")
}

pub fn is_option_type(ty: &syn::Type) -> bool {
    option_inner_type(ty).is_some()
}

/// Whether the type's last path segment is `name`.
pub fn is_named_type(ty: &syn::Type, name: &str) -> bool {
    if let syn::Type::Path(syn::TypePath { path, .. }) = ty {
        if let Some(seg) = path.segments.last() {
            return seg.ident == name;
        }
    }
    false
}
