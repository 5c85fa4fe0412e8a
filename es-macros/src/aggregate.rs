use crate::utils::{apply_derives, prepend_managed_field};
use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Item, Result, Token, Type, parse::Parse, parse::ParseStream, parse_macro_input};

/// #[aggregate] 宏实现
/// - 在字段最前追加 `core: ::es_domain::aggregate::AggregateCore<Id, Event>`
/// - 自动实现 `::es_domain::entity::Entity`（core/core_mut，id/version 使用默认实现）
/// - 支持参数：`#[aggregate(id = IdType, event = EventType, debug = true|false)]`；
///   - `id` 默认 `String`
///   - `event` 必填
///   - `debug` 默认 `true`（派生 Debug）
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as AggregateAttrConfig);
    let input = parse_macro_input!(item as Item);

    let mut st = match input {
        Item::Struct(s) => s,
        other => {
            return syn::Error::new(other.span(), "#[aggregate] only on struct")
                .to_compile_error()
                .into();
        }
    };

    let Some(event_type) = cfg.event_ty else {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "missing required key 'event', e.g. #[aggregate(event = MyEvent)]",
        )
        .to_compile_error()
        .into();
    };
    let id_type = cfg.id_ty.unwrap_or_else(|| syn::parse_quote! { String });

    // 单元结构体视为空的具名字段结构体
    if matches!(st.fields, syn::Fields::Unit) {
        st.fields = syn::Fields::Named(syn::parse_quote!({}));
        st.semi_token = None;
    }

    let fields_named = match &mut st.fields {
        syn::Fields::Named(f) => f,
        _ => {
            return syn::Error::new(st.span(), "only supports named-field struct")
                .to_compile_error()
                .into();
        }
    };

    let core_ty: Type = syn::parse_quote! {
        ::es_domain::aggregate::AggregateCore<#id_type, #event_type>
    };
    if let Err(err) = prepend_managed_field(fields_named, "core", &core_ty) {
        return err.to_compile_error().into();
    }

    let mut required: Vec<syn::Path> = vec![syn::parse_quote!(Default)];
    if cfg.derive_debug.unwrap_or(true) {
        required.insert(0, syn::parse_quote!(Debug));
    }
    apply_derives(&mut st.attrs, required);

    let ident = &st.ident;
    let (impl_generics, ty_generics, where_clause) = st.generics.split_for_impl();

    let expanded = quote! {
        #st

        impl #impl_generics ::es_domain::entity::Entity for #ident #ty_generics #where_clause {
            type Id = #id_type;
            type Event = #event_type;

            fn core(&self) -> &#core_ty { &self.core }

            fn core_mut(&mut self) -> &mut #core_ty { &mut self.core }
        }
    };

    TokenStream::from(expanded)
}

// -------- parsing --------

struct AggregateAttrConfig {
    id_ty: Option<Type>,
    event_ty: Option<Type>,
    derive_debug: Option<bool>,
}

impl Parse for AggregateAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut cfg = Self {
            id_ty: None,
            event_ty: None,
            derive_debug: None,
        };

        let elems: Punctuated<AggregateAttrElem, Token![,]> =
            Punctuated::<AggregateAttrElem, Token![,]>::parse_terminated(input)?;

        for elem in elems.into_iter() {
            match elem {
                AggregateAttrElem::Id(ty) => {
                    if cfg.id_ty.is_some() {
                        return Err(syn::Error::new(ty.span(), "duplicate key 'id' in attribute"));
                    }
                    cfg.id_ty = Some(*ty);
                }
                AggregateAttrElem::Event(ty) => {
                    if cfg.event_ty.is_some() {
                        return Err(syn::Error::new(
                            ty.span(),
                            "duplicate key 'event' in attribute",
                        ));
                    }
                    cfg.event_ty = Some(*ty);
                }
                AggregateAttrElem::Debug(b) => {
                    if cfg.derive_debug.is_some() {
                        return Err(syn::Error::new(
                            proc_macro2::Span::call_site(),
                            "duplicate key 'debug' in attribute",
                        ));
                    }
                    cfg.derive_debug = Some(b);
                }
            }
        }

        Ok(cfg)
    }
}

enum AggregateAttrElem {
    Id(Box<Type>),
    Event(Box<Type>),
    Debug(bool),
}

impl Parse for AggregateAttrElem {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: syn::Ident = input.parse()?;
        let _eq: Token![=] = input.parse()?;
        if key == "id" {
            Ok(AggregateAttrElem::Id(Box::new(input.parse()?)))
        } else if key == "event" {
            Ok(AggregateAttrElem::Event(Box::new(input.parse()?)))
        } else if key == "debug" {
            let lit: syn::LitBool = input.parse()?;
            Ok(AggregateAttrElem::Debug(lit.value()))
        } else {
            Err(syn::Error::new(
                key.span(),
                "unknown key in attribute; expected 'id', 'event' or 'debug'",
            ))
        }
    }
}
