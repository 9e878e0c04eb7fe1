//! Derive macro for tablesync record types.
//!
//! This crate provides `#[derive(Record)]`, which turns a struct with named
//! fields into a table declaration: table name, column shape, extension
//! directives and the row codec.

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::parse::Parse;
use syn::spanned::Spanned;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Fields, GenericArgument, Ident, LitInt,
    LitStr, Meta, PathArguments, Token, Type,
};

/// Derives the `Record` trait for a struct.
///
/// # Attributes
///
/// - `#[record(table = "table_name")]` - Specifies the SQL table name
///   (optional, defaults to snake_case of struct name)
///
/// # Field Attributes
///
/// - `#[column(name = "column_name")]` - Specifies the SQL column name
///   (optional, defaults to field name)
/// - `#[column(primary_key)]` - Marks the field as the primary key
/// - `#[column(ignore)]` - Leaves the field out of the table; it is read
///   back as `Default::default()`
/// - `#[column(nullable)]` - Marks the column as nullable (`Option<T>`
///   fields always are)
/// - `#[column(length = N)]` - Sets the `VARCHAR` length of a `String`
///   field (default 255)
/// - `#[column(sql_type = "TYPE")]` - Spells out the SQL type verbatim
/// - `#[column(unbounded)]` - Widens the column to unbounded text after the
///   table is created
/// - `#[column(composite_key(name = "pk", columns("a", "b")))]` - Adds a
///   named primary key over several columns after the table is created
///
/// A field carries at most one directive (`unbounded` or `composite_key`),
/// and an ignored field carries none.
///
/// # Type Mapping
///
/// | Rust | SQL |
/// |---|---|
/// | `i8`, `i16`, `u8` | `SmallInt` |
/// | `i32`, `u16` | `Integer` |
/// | `i64`, `u32`, `u64`, `isize`, `usize` | `BigInt` |
/// | `f32` / `f64` | `Real` / `Double` |
/// | `bool` | `Boolean` |
/// | `String` | `Varchar(255)` |
/// | `Vec<u8>` | `Blob` |
/// | `Option<T>` | nullable `T` |
///
/// Any other type needs `sql_type`, and must implement `ToValue`,
/// `FromValue` and `Default`.
#[proc_macro_derive(Record, attributes(record, column))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_record_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

#[allow(clippy::too_many_lines)]
fn derive_record_impl(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let table_name = get_table_name(&input.attrs, struct_name)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record derive only supports structs",
            ));
        }
    };

    // Collect field information
    let mut field_infos: Vec<FieldInfo> = Vec::new();
    for field in fields {
        let Some(field_name) = field.ident.clone() else {
            return Err(syn::Error::new_spanned(field, "expected a named field"));
        };
        let attrs = parse_column_attrs(&field.attrs)?;

        if attrs.ignore {
            if let Some((span, _)) = attrs.directive {
                return Err(syn::Error::new(
                    span,
                    format!("field `{field_name}` is ignored and cannot carry a directive"),
                ));
            }
            field_infos.push(FieldInfo {
                field_name,
                field_type: field.ty.clone(),
                column: None,
            });
            continue;
        }

        let column_name = attrs.name.unwrap_or_else(|| field_name.to_string());
        let (inner_type, is_option) = match option_inner(&field.ty) {
            Some(inner) => (inner, true),
            None => (&field.ty, false),
        };
        let sql_type = match attrs.sql_type {
            Some(custom) => quote! { ::tablesync::SqlType::Custom(#custom) },
            None => infer_sql_type(inner_type, attrs.length).ok_or_else(|| {
                syn::Error::new_spanned(
                    &field.ty,
                    format!(
                        "cannot map the type of field `{field_name}` to SQL; \
                         add #[column(sql_type = \"...\")]"
                    ),
                )
            })?,
        };
        if attrs.length.is_some() && !is_string(inner_type) {
            return Err(syn::Error::new_spanned(
                &field.ty,
                "`length` only applies to String fields",
            ));
        }

        field_infos.push(FieldInfo {
            field_name: field_name.clone(),
            field_type: field.ty.clone(),
            column: Some(ColumnInfo {
                field_name,
                column_name,
                sql_type,
                is_primary_key: attrs.primary_key,
                is_nullable: (is_option || attrs.nullable) && !attrs.primary_key,
                directive: attrs.directive.map(|(_, d)| d),
            }),
        });
    }

    let columns: Vec<&ColumnInfo> = field_infos.iter().filter_map(|f| f.column.as_ref()).collect();

    let mut primary_keys = columns.iter().filter(|c| c.is_primary_key);
    let primary_key = primary_keys.next();
    if let Some(second) = primary_keys.next() {
        return Err(syn::Error::new_spanned(
            &second.field_name,
            "only one field can be #[column(primary_key)]; use composite_key for a multi-column key",
        ));
    }

    let primary_key_impl = if let Some(pk) = primary_key {
        let pk = &pk.column_name;
        quote! {
            const PRIMARY_KEY: Option<&'static str> = Some(#pk);
        }
    } else {
        quote! {
            const PRIMARY_KEY: Option<&'static str> = None;
        }
    };

    // Generate ColumnDef entries
    let column_defs: Vec<TokenStream2> = columns
        .iter()
        .map(|info| {
            let name = &info.column_name;
            let sql_type = &info.sql_type;
            let nullable = info.is_nullable;
            let primary_key = info.is_primary_key;
            quote! {
                ::tablesync::ColumnDef {
                    name: #name,
                    sql_type: #sql_type,
                    nullable: #nullable,
                    primary_key: #primary_key,
                }
            }
        })
        .collect();

    // Generate the directive registration table
    let directive_entries: Vec<TokenStream2> = columns
        .iter()
        .filter_map(|info| {
            let field = info.field_name.to_string();
            let directive = match info.directive.as_ref()? {
                Directive::Unbounded => {
                    let column = &info.column_name;
                    quote! {
                        ::tablesync::ExtensionDirective::WidenColumnToUnbounded { column: #column }
                    }
                }
                Directive::CompositeKey { name, columns } => quote! {
                    ::tablesync::ExtensionDirective::AddCompositePrimaryKey {
                        name: #name,
                        columns: &[#(#columns),*],
                    }
                },
            };
            Some(quote! { ::tablesync::FieldDirective::new(#field, #directive) })
        })
        .collect();

    let to_row_pushes: Vec<TokenStream2> = columns
        .iter()
        .map(|info| {
            let field = &info.field_name;
            let name = &info.column_name;
            quote! {
                row.push(#name, ::tablesync::ToValue::to_value(&self.#field));
            }
        })
        .collect();

    let from_row_fields: Vec<TokenStream2> = field_infos
        .iter()
        .map(|f| {
            let field = &f.field_name;
            let ty = &f.field_type;
            match &f.column {
                Some(info) => {
                    let name = &info.column_name;
                    quote! {
                        #field: row
                            .get(#name)
                            .and_then(<#ty as ::tablesync::FromValue>::from_value)
                            .unwrap_or_default()
                    }
                }
                None => quote! {
                    #field: ::core::default::Default::default()
                },
            }
        })
        .collect();

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        #[automatically_derived]
        impl #impl_generics ::tablesync::Record for #struct_name #ty_generics #where_clause {
            const TABLE: &'static str = #table_name;
            const COLUMNS: &'static [::tablesync::ColumnDef] = &[
                #(#column_defs),*
            ];
            #primary_key_impl
            const DIRECTIVES: &'static [::tablesync::FieldDirective] = &[
                #(#directive_entries),*
            ];

            fn to_row(&self) -> ::tablesync::Row {
                let mut row = ::tablesync::Row::new();
                #(#to_row_pushes)*
                row
            }

            fn from_row(row: &::tablesync::Row) -> Self {
                Self {
                    #(#from_row_fields),*
                }
            }
        }
    };

    Ok(expanded)
}

struct FieldInfo {
    field_name: Ident,
    field_type: Type,
    /// `None` for ignored fields.
    column: Option<ColumnInfo>,
}

struct ColumnInfo {
    field_name: Ident,
    column_name: String,
    sql_type: TokenStream2,
    is_primary_key: bool,
    is_nullable: bool,
    directive: Option<Directive>,
}

enum Directive {
    Unbounded,
    CompositeKey { name: String, columns: Vec<String> },
}

#[derive(Default)]
struct ColumnAttrs {
    name: Option<String>,
    primary_key: bool,
    ignore: bool,
    nullable: bool,
    length: Option<usize>,
    sql_type: Option<String>,
    directive: Option<(Span, Directive)>,
}

fn get_table_name(attrs: &[Attribute], struct_name: &Ident) -> syn::Result<String> {
    for attr in attrs {
        if attr.path().is_ident("record") {
            let mut table_name = None;
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    let value: LitStr = meta.value()?.parse()?;
                    table_name = Some(value.value());
                    Ok(())
                } else {
                    Err(meta.error("expected `table = \"...\"`"))
                }
            })?;
            if let Some(name) = table_name {
                return Ok(name);
            }
        }
    }
    // Default to snake_case of struct name
    Ok(to_snake_case(&struct_name.to_string()))
}

fn parse_column_attrs(attrs: &[Attribute]) -> syn::Result<ColumnAttrs> {
    let mut result = ColumnAttrs::default();

    for attr in attrs {
        if attr.path().is_ident("column") {
            // Handle empty attribute like #[column]
            if matches!(attr.meta, Meta::Path(_)) {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("primary_key") {
                    result.primary_key = true;
                } else if meta.path.is_ident("ignore") {
                    result.ignore = true;
                } else if meta.path.is_ident("nullable") {
                    result.nullable = true;
                } else if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    result.name = Some(value.value());
                } else if meta.path.is_ident("sql_type") {
                    let value: LitStr = meta.value()?.parse()?;
                    result.sql_type = Some(value.value());
                } else if meta.path.is_ident("length") {
                    let value: LitInt = meta.value()?.parse()?;
                    result.length = Some(value.base10_parse()?);
                } else if meta.path.is_ident("unbounded") {
                    if result.directive.is_some() {
                        return Err(meta.error("a field carries at most one directive"));
                    }
                    result.directive = Some((meta.path.span(), Directive::Unbounded));
                } else if meta.path.is_ident("composite_key") {
                    if result.directive.is_some() {
                        return Err(meta.error("a field carries at most one directive"));
                    }
                    let span = meta.path.span();
                    let mut name = None;
                    let mut columns = Vec::new();
                    meta.parse_nested_meta(|inner| {
                        if inner.path.is_ident("name") {
                            let value: LitStr = inner.value()?.parse()?;
                            name = Some(value.value());
                        } else if inner.path.is_ident("columns") {
                            let content;
                            syn::parenthesized!(content in inner.input);
                            let list = content.parse_terminated(
                                <LitStr as Parse>::parse,
                                Token![,],
                            )?;
                            columns.extend(list.iter().map(LitStr::value));
                        } else {
                            return Err(inner.error("expected `name` or `columns`"));
                        }
                        Ok(())
                    })?;
                    let Some(name) = name else {
                        return Err(meta.error("composite_key needs `name = \"...\"`"));
                    };
                    result.directive = Some((span, Directive::CompositeKey { name, columns }));
                } else {
                    return Err(meta.error("unknown column attribute"));
                }
                Ok(())
            })?;
        }
    }

    Ok(result)
}

fn last_segment(ty: &Type) -> Option<&syn::PathSegment> {
    match ty {
        Type::Path(path) if path.qself.is_none() => path.path.segments.last(),
        _ => None,
    }
}

fn first_type_argument(segment: &syn::PathSegment) -> Option<&Type> {
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}

/// Returns `T` for `Option<T>`.
fn option_inner(ty: &Type) -> Option<&Type> {
    let segment = last_segment(ty)?;
    if segment.ident == "Option" {
        first_type_argument(segment)
    } else {
        None
    }
}

fn is_string(ty: &Type) -> bool {
    last_segment(ty).is_some_and(|s| s.ident == "String")
}

fn infer_sql_type(ty: &Type, length: Option<usize>) -> Option<TokenStream2> {
    let segment = last_segment(ty)?;
    let tokens = match segment.ident.to_string().as_str() {
        "i8" | "i16" | "u8" => quote! { ::tablesync::SqlType::SmallInt },
        "i32" | "u16" => quote! { ::tablesync::SqlType::Integer },
        "i64" | "u32" | "u64" | "isize" | "usize" => quote! { ::tablesync::SqlType::BigInt },
        "f32" => quote! { ::tablesync::SqlType::Real },
        "f64" => quote! { ::tablesync::SqlType::Double },
        "bool" => quote! { ::tablesync::SqlType::Boolean },
        "String" => {
            let length = length.unwrap_or(255);
            quote! { ::tablesync::SqlType::Varchar(#length) }
        }
        "Vec" => {
            let inner = last_segment(first_type_argument(segment)?)?;
            if inner.ident != "u8" {
                return None;
            }
            quote! { ::tablesync::SqlType::Blob }
        }
        _ => return None,
    };
    Some(tokens)
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}
