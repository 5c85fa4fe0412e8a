use crate::utils::apply_derives;
use proc_macro::TokenStream;
use quote::quote;
use std::collections::HashMap;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Expr, Ident, Item, Result, Token, parse::Parse, parse::ParseStream, parse_macro_input};

/// #[event] 宏实现
/// - 支持具名、元组与单元变体
/// - 派生 Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize（与已有 derive 合并）
/// - 生成 `::es_domain::domain_event::DomainEvent` 实现（EVENT_TYPES/event_type）
/// - 事件类型默认为 `Enum.Variant`，变体可覆写：`#[event(event_type = "...")]`
/// - 同一枚举内事件类型重复时编译失败
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[event] on an enum takes no arguments; use #[event(event_type = ...)] on variants",
        )
        .to_compile_error()
        .into();
    }

    let mut input = parse_macro_input!(item as Item);
    let enum_item = match &mut input {
        Item::Enum(e) => e,
        other => {
            return syn::Error::new(other.span(), "#[event] can only be used on enum types")
                .to_compile_error()
                .into();
        }
    };

    if enum_item.variants.is_empty() {
        return syn::Error::new(enum_item.span(), "#[event] requires at least one variant")
            .to_compile_error()
            .into();
    }

    let required: Vec<syn::Path> = vec![
        syn::parse_quote!(Debug),
        syn::parse_quote!(Clone),
        syn::parse_quote!(PartialEq),
        syn::parse_quote!(serde::Serialize),
        syn::parse_quote!(serde::Deserialize),
    ];
    apply_derives(&mut enum_item.attrs, required);

    let enum_name = enum_item.ident.to_string();
    let mut seen: HashMap<String, Ident> = HashMap::new();
    let mut arms = Vec::with_capacity(enum_item.variants.len());
    let mut type_lits = Vec::with_capacity(enum_item.variants.len());

    for v in &mut enum_item.variants {
        let mut retained_attrs = Vec::new();
        let mut type_lit: Option<syn::LitStr> = None;

        for attr in v.attrs.iter() {
            if !attr.path().is_ident("event") {
                retained_attrs.push(attr.clone());
                continue;
            }
            match parse_variant_event_attr(attr) {
                Ok(lit) => {
                    if type_lit.is_some() {
                        return syn::Error::new(
                            attr.span(),
                            "duplicate 'event_type' specified for this variant",
                        )
                        .to_compile_error()
                        .into();
                    }
                    type_lit = Some(lit);
                }
                Err(err) => return err.to_compile_error().into(),
            }
        }
        v.attrs = retained_attrs;

        let v_ident = &v.ident;
        let lit = type_lit.unwrap_or_else(|| {
            syn::LitStr::new(&format!("{enum_name}.{v_ident}"), v_ident.span())
        });

        if lit.value().is_empty() {
            return syn::Error::new(lit.span(), "event type must not be empty")
                .to_compile_error()
                .into();
        }
        if let Some(previous) = seen.insert(lit.value(), v_ident.clone()) {
            return syn::Error::new(
                lit.span(),
                format!(
                    "event type \"{}\" is already used by variant `{previous}`",
                    lit.value()
                ),
            )
            .to_compile_error()
            .into();
        }

        arms.push(quote! { Self::#v_ident { .. } => #lit });
        type_lits.push(lit);
    }

    let enum_ident = &enum_item.ident;
    let (impl_generics, ty_generics, where_clause) = enum_item.generics.split_for_impl();

    let out = quote! {
        #enum_item

        impl #impl_generics ::es_domain::domain_event::DomainEvent for #enum_ident #ty_generics #where_clause {
            const EVENT_TYPES: &'static [&'static str] = &[ #( #type_lits ),* ];

            fn event_type(&self) -> &'static str {
                match self { #( #arms, )* }
            }
        }
    };

    TokenStream::from(out)
}

// -------- parsing --------

fn parse_variant_event_attr(attr: &syn::Attribute) -> Result<syn::LitStr> {
    let syn::Meta::List(_) = &attr.meta else {
        return Err(syn::Error::new(
            attr.span(),
            "expected #[event(event_type = \"...\")]",
        ));
    };

    let mut ty: Option<syn::LitStr> = None;
    let pairs: Punctuated<VariantEventAttrKv, Token![,]> =
        attr.parse_args_with(Punctuated::<VariantEventAttrKv, Token![,]>::parse_terminated)?;

    for kv in pairs {
        if kv.key != "event_type" {
            return Err(syn::Error::new(kv.key.span(), "unknown key; expected 'event_type'"));
        }
        if ty.is_some() {
            return Err(syn::Error::new(
                kv.key.span(),
                "duplicate key 'event_type' in attribute",
            ));
        }
        match kv.value {
            Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Str(lit),
                ..
            }) => ty = Some(lit),
            other => {
                return Err(syn::Error::new(
                    other.span(),
                    "expected string literal for 'event_type'",
                ));
            }
        }
    }

    ty.ok_or_else(|| syn::Error::new(attr.span(), "missing 'event_type'"))
}

struct VariantEventAttrKv {
    key: Ident,
    value: Expr,
}

impl Parse for VariantEventAttrKv {
    fn parse(input: ParseStream) -> Result<Self> {
        let key = input.parse()?;
        let _eq: Token![=] = input.parse()?;
        Ok(Self {
            key,
            value: input.parse()?,
        })
    }
}
