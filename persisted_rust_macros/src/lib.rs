mod entity;

use proc_macro::TokenStream;

// ============================================================================
// #[derive(Entity)] derive macro
// ============================================================================

/// Derive macro for the `Entity` trait.
///
/// # Usage
///
/// ```ignore
/// #[derive(Clone, Default, Serialize, Deserialize, Entity)]
/// #[entity(collection = "people")]
/// struct Person {
///     #[entity(unique)]
///     pub email: String,
///     #[entity(sort)]
///     pub age: u32,
/// }
///
/// // generated accessor, usable as a sort key
/// store.fetch::<Person>().sorted(Person::age_key(), true);
/// ```
///
/// Attributes:
/// - `#[entity(collection = "...")]` on the struct names the collection;
///   defaults to the snake_case struct name plus `s`.
/// - `#[entity(unique)]` on at most one field makes its `to_string()` the
///   entity's unique key.
/// - `#[entity(sort)]` on a field generates `<field>_key()`, a
///   `FieldAccessor` reading that field (the field type must convert into
///   `Value`).
#[proc_macro_derive(Entity, attributes(entity))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    entity::derive_entity(input)
}
