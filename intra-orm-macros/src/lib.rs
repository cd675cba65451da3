mod entity;

use entity::derive_entity;
use proc_macro::TokenStream;
use proc_macro_error2::proc_macro_error;

#[proc_macro_error]
#[proc_macro_derive(Entity, attributes(orm))]
pub fn entity(input: TokenStream) -> TokenStream {
    derive_entity(input.into()).into()
}
