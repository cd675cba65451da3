use convert_case::{Case, Casing};
use darling::{FromDeriveInput, FromField, ast::Data, util::Flag};
use proc_macro_error2::{abort, emit_error};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{DeriveInput, Ident, Type, ext::IdentExt, parse2};

#[derive(FromField, Debug, Clone)]
#[darling(attributes(orm))]
struct DeriveEntityField {
    ident: Option<Ident>,
    ty: Type,
    column: Option<String>,
    skip: Flag,
    many_to_one: Flag,
    one_to_many: Flag,
    one_to_one: Flag,
    many_to_many: Flag,
    inverse: Option<String>,
    join_table: Option<String>,
}

#[derive(FromDeriveInput)]
#[darling(attributes(orm))]
struct DeriveEntityTarget {
    ident: Ident,
    table: Option<String>,
    primary_key: Ident,
    data: Data<(), DeriveEntityField>,
}

#[derive(Clone)]
struct TargetColumn {
    field_ident: Ident,
    logical_name: String,
    db_name: String,
    ty: Type,
}

#[derive(Clone)]
struct TargetRelation {
    field_ident: Ident,
    logical_name: String,
    kind: Ident,
    inverse: Option<String>,
    join_table: Option<String>,
    ty: Type,
}

pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match parse2(input) {
        Ok(e) => e,
        Err(e) => return e.to_compile_error(),
    };

    let target = match DeriveEntityTarget::from_derive_input(&input) {
        Ok(r) => r,
        Err(e) => return e.write_errors(),
    };

    let Some(struct_data) = target.data.take_struct() else {
        abort! {
            input, "Target is not a struct.";
            note = "This macro must be run on a struct.";
        };
    };

    let mut columns = vec![];
    let mut relations = vec![];

    for field in &struct_data.fields {
        let Some(ident) = &field.ident else {
            abort! {
                field.ident, "Field has no ident.";
                note = "This macro cannot be run on tuple structs.";
            };
        };

        if field.skip.is_present() {
            continue;
        }

        let logical_name = ident.unraw().to_string().to_case(Case::Camel);

        let kinds = [
            (&field.many_to_one, "ManyToOne"),
            (&field.one_to_many, "OneToMany"),
            (&field.one_to_one, "OneToOne"),
            (&field.many_to_many, "ManyToMany"),
        ]
        .into_iter()
        .filter(|(flag, _)| flag.is_present())
        .map(|(_, kind)| kind)
        .collect::<Vec<_>>();

        if kinds.len() > 1 {
            abort! {
                ident, "Conflicting relation kinds {:?}.", kinds;
                note = "A relation field has exactly one of many_to_one, one_to_many, one_to_one or many_to_many.";
            };
        }

        let kind = kinds.first().copied();

        if field.inverse.is_some() && !matches!(kind, Some("OneToMany" | "OneToOne")) {
            emit_error! {
                ident, "`inverse` is only valid on one_to_many and one_to_one relations."
            };
        }

        if field.join_table.is_some() && kind != Some("ManyToMany") {
            emit_error! {
                ident, "`join_table` is only valid on many_to_many relations."
            };
        }

        if matches!(kind, None | Some("ManyToOne")) {
            columns.push(TargetColumn {
                field_ident: ident.clone(),
                db_name: field
                    .column
                    .clone()
                    .unwrap_or_else(|| logical_name.to_case(Case::Snake)),
                logical_name: logical_name.clone(),
                ty: field.ty.clone(),
            });
        } else if field.column.is_some() {
            emit_error! {
                ident, "Collection and one_to_one relations have no column on this table.";
                note = "Use `inverse = \"...\"` to name the foreign key column on the related table.";
            };
        }

        if let Some(kind) = kind {
            relations.push(TargetRelation {
                field_ident: ident.clone(),
                logical_name,
                kind: format_ident!("{kind}"),
                inverse: field.inverse.clone(),
                join_table: field.join_table.clone(),
                ty: field.ty.clone(),
            });
        }
    }

    // Make sure all columns have unique names.
    if let Some(duplicate) = columns
        .iter()
        .find(|e| columns.iter().filter(|o| e.db_name.eq(&o.db_name)).count() > 1)
    {
        columns.iter().for_each(|e| {
            if columns.iter().filter(|o| e.db_name.eq(&o.db_name)).count() > 1 {
                emit_error! {
                    e.field_ident.span(), "Clashing occurrence of \"{}\" here.", e.db_name
                };
            }
        });

        abort! {
            duplicate.field_ident.span(), "Duplicate column definition \"{}\"", duplicate.db_name;
            note = "Columns must have unique names, if necessary use the #[orm(column = \"my_column_name\")] attribute to specify a unique name.";
        }
    }

    let Some(primary_key) = columns
        .iter()
        .find(|e| e.field_ident.eq(&target.primary_key))
    else {
        abort! {
            target.primary_key, "Missing primary key column.";
            note = "You need to specify which column is supposed to act as the primary key, using #[orm(primary_key = field_name)]. It must not be skipped or be a collection.";
        }
    };

    let entity_ident = &target.ident;
    let table_name = target
        .table
        .clone()
        .unwrap_or_else(|| target.ident.to_string().to_case(Case::Snake));
    let key_ty = &primary_key.ty;
    let key_ident = &primary_key.field_ident;
    let key_name = &primary_key.logical_name;

    let column_decls = columns.iter().map(|e| {
        let ty = &e.ty;
        let logical_name = &e.logical_name;
        let db_name = &e.db_name;

        quote! {
            table.column(
                ::intra_orm::registry::ColumnDescriptor::of::<#ty>(#logical_name).physical(#db_name),
            );
        }
    });

    let relation_decls = relations.iter().map(|e| {
        let ty = &e.ty;
        let logical_name = &e.logical_name;
        let kind = &e.kind;
        let inverse = e.inverse.as_ref().map(|e| quote! { .inverse(#e) });
        let join_table = e.join_table.as_ref().map(|e| quote! { .through(#e) });

        quote! {
            table.relation(
                #logical_name,
                ::intra_orm::registry::RelationDescriptor::new::<
                    <#ty as ::intra_orm::entity::relation::Related>::Target,
                >(::intra_orm::registry::RelationKind::#kind)
                #inverse
                #join_table,
            );
        }
    });

    let column_reads = columns.iter().map(|e| {
        let ident = &e.field_ident;
        let logical_name = &e.logical_name;

        quote! {
            #logical_name => ::intra_orm::entity::column::ColumnType::to_value(&self.#ident),
        }
    });

    let column_writes = columns.iter().map(|e| {
        let ident = &e.field_ident;
        let ty = &e.ty;
        let logical_name = &e.logical_name;

        quote! {
            #logical_name => {
                self.#ident = <#ty as ::intra_orm::entity::column::ColumnType>::from_value(value)?;
            }
        }
    });

    let relation_refs = relations.iter().map(|e| {
        let ident = &e.field_ident;
        let logical_name = &e.logical_name;

        quote! {
            (#logical_name, &self.#ident as &dyn ::intra_orm::entity::relation::RelationField)
        }
    });

    let relation_muts = relations.iter().map(|e| {
        let ident = &e.field_ident;
        let logical_name = &e.logical_name;

        quote! {
            (#logical_name, &mut self.#ident as &mut dyn ::intra_orm::entity::relation::RelationField)
        }
    });

    quote! {
        impl ::intra_orm::entity::Entity for #entity_ident {
            type Key = #key_ty;

            fn describe(table: &mut ::intra_orm::registry::TableBuilder) {
                table.table(#table_name);

                #(
                    #column_decls
                )*

                #(
                    #relation_decls
                )*

                table.primary_key(#key_name);
            }

            fn key(&self) -> Self::Key {
                ::std::clone::Clone::clone(&self.#key_ident)
            }

            fn column_value(&self, field: &str) -> ::intra_orm::value::Value {
                match field {
                    #(
                        #column_reads
                    )*
                    _ => ::std::panic!(
                        "`{}` has no column for field `{}`",
                        ::std::stringify!(#entity_ident),
                        field
                    ),
                }
            }

            fn set_column_value(
                &mut self,
                field: &str,
                value: ::intra_orm::value::Value,
            ) -> ::std::result::Result<(), ::std::string::String> {
                match field {
                    #(
                        #column_writes
                    )*
                    _ => ::std::panic!(
                        "`{}` has no column for field `{}`",
                        ::std::stringify!(#entity_ident),
                        field
                    ),
                }

                Ok(())
            }

            fn relations(
                &self,
            ) -> ::std::vec::Vec<(&'static str, &dyn ::intra_orm::entity::relation::RelationField)> {
                ::std::vec![
                    #(
                        #relation_refs
                    ),*
                ]
            }

            fn relations_mut(
                &mut self,
            ) -> ::std::vec::Vec<(&'static str, &mut dyn ::intra_orm::entity::relation::RelationField)> {
                ::std::vec![
                    #(
                        #relation_muts
                    ),*
                ]
            }
        }
    }
}

#[cfg(test)]
mod test {
    use quote::quote;

    use super::derive_entity;

    #[test]
    fn test_derive_entity() {
        let expanded = derive_entity(quote! {
            #[orm(table = "owners", primary_key = id)]
            struct Owner {
                id: i64,
                r#type: String,
                #[orm(one_to_one, inverse = "owner_id")]
                profile: HasOne<Profile>,
                #[orm(many_to_many, join_table = "owners_with_tags")]
                tags: HasMany<Tag>,
            }
        })
        .to_string()
        .replace(' ', "");

        assert!(expanded.contains("impl::intra_orm::entity::EntityforOwner"));
        assert!(expanded.contains("table.table(\"owners\")"));
        assert!(expanded.contains("(\"type\").physical(\"type\")"));
        assert!(expanded.contains("RelationKind::OneToOne"));
        assert!(expanded.contains(".inverse(\"owner_id\")"));
        assert!(expanded.contains(".through(\"owners_with_tags\")"));
    }
}
