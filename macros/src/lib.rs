//! Derive macros for the spotswap marketplace engine.
//!
//! # Available Macros
//!
//! - `#[derive(DomainEvent)]`: implements `spotswap_core::event::Event`
//!   for an event enum, generating the stable `Variant.v1` type identifier
//!   per variant and classifying variants marked `#[integration]`
//!
//! # Example
//!
//! ```ignore
//! use spotswap_macros::DomainEvent;
//!
//! #[derive(DomainEvent, Clone, Debug, Serialize, Deserialize)]
//! enum SpotEvent {
//!     SpotBooked { booking_id: BookingId },
//!
//!     #[integration]
//!     SpotBecameAvailable { availability_id: AvailabilityId },
//! }
//!
//! // Generated:
//! // impl Event for SpotEvent {
//! //     fn event_type(&self) -> &'static str { "SpotBooked.v1" | ... }
//! //     fn is_integration(&self) -> bool { ... }
//! // }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, parse_macro_input};

/// Derive macro for domain event enums.
///
/// Implements `spotswap_core::event::Event`:
///
/// - `event_type()` returns `"<VariantName>.v1"` for each variant; the
///   stable identifier used for dispatch-table keys and job payloads
/// - `is_integration()` returns `true` for variants marked
///   `#[integration]`, i.e. events whose handlers must have outbox
///   guarantees
///
/// # Panics
///
/// Produces a compile error (not a runtime panic) when applied to a
/// non-enum type.
#[proc_macro_derive(DomainEvent, attributes(integration))]
pub fn derive_domain_event(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(input, "#[derive(DomainEvent)] can only be used on enums")
            .to_compile_error()
            .into();
    };

    let event_type_arms = data_enum.variants.iter().map(|variant| {
        let variant_name = &variant.ident;
        let type_name = format!("{variant_name}.v1");
        match &variant.fields {
            Fields::Named(_) => quote! { Self::#variant_name { .. } => #type_name, },
            Fields::Unnamed(_) => quote! { Self::#variant_name(..) => #type_name, },
            Fields::Unit => quote! { Self::#variant_name => #type_name, },
        }
    });

    let integration_arms: Vec<_> = data_enum
        .variants
        .iter()
        .filter(|variant| has_attribute(&variant.attrs, "integration"))
        .map(|variant| {
            let variant_name = &variant.ident;
            match &variant.fields {
                Fields::Named(_) => quote! { Self::#variant_name { .. } => true, },
                Fields::Unnamed(_) => quote! { Self::#variant_name(..) => true, },
                Fields::Unit => quote! { Self::#variant_name => true, },
            }
        })
        .collect();

    let is_integration_body = if integration_arms.is_empty() {
        quote! { false }
    } else {
        quote! {
            match self {
                #(#integration_arms)*
                _ => false,
            }
        }
    };

    let expanded = quote! {
        impl ::spotswap_core::event::Event for #name {
            fn event_type(&self) -> &'static str {
                match self {
                    #(#event_type_arms)*
                }
            }

            fn is_integration(&self) -> bool {
                #is_integration_body
            }
        }
    };

    TokenStream::from(expanded)
}

/// Helper to check whether an attribute list contains a given attribute.
fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}
