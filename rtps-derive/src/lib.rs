//! Derive macros for the RTPS render-target particle simulation.
//!
//! This crate provides one derive macro:
//!
//! - [`UniformBlock`] - Generates a GPU-compatible uniform struct and its WGSL twin
//!
//! # Usage
//!
//! The macro is re-exported from the main `rtps` crate. You don't need to
//! add this crate directly:
//!
//! ```ignore
//! use rtps::prelude::*;
//!
//! #[derive(UniformBlock, Clone)]
//! #[wgsl(name = "SimParams")]
//! struct SimParams {
//!     frame: f32,
//!     noise_mix: f32,
//!     mouse_pos: Vec2,
//! }
//! ```
//!
//! # GPU Memory Layout
//!
//! Uniform buffers follow WGSL's host-shareable layout rules:
//! - `Vec3` and `Vec4` require 16-byte alignment, `Vec2` 8-byte alignment
//! - `Mat4` is 64 bytes with 16-byte alignment
//! - The struct size is rounded up to a multiple of 16 bytes
//!
//! Padding is emitted as individual `f32` fields (`_pad0`, `_pad1`, ...) rather
//! than `array<f32, N>`, because arrays in the uniform address space need a
//! 16-byte element stride.

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Ident, LitStr, Type};

/// Derive macro for shader uniform blocks.
///
/// # Generated Items
///
/// For a struct `SimParams`:
///
/// - `SimParamsGpu` - `#[repr(C)]` Pod struct with explicit padding
/// - `impl rtps::UniformBlock for SimParams` providing `WGSL_NAME`,
///   `WGSL_STRUCT`, `SIZE` and `to_gpu()`
///
/// The WGSL struct name defaults to the Rust name and can be overridden with
/// `#[wgsl(name = "...")]`.
///
/// # Supported field types
///
/// `f32`, `u32`, `i32`, `Vec2`, `Vec3`, `Vec4`, `Mat4` (optionally written
/// with a `glam::` prefix).
///
/// # Panics
///
/// The macro panics at compile time if:
/// - Applied to an enum, union or tuple struct
/// - A field has an unsupported type
#[proc_macro_derive(UniformBlock, attributes(wgsl))]
pub fn derive_uniform_block(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let vis = &input.vis;
    let gpu_name = Ident::new(&format!("{}Gpu", name), Span::call_site());

    let mut wgsl_name = name.to_string();
    for attr in &input.attrs {
        if !attr.path().is_ident("wgsl") {
            continue;
        }
        let parsed = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                wgsl_name = value.value();
                Ok(())
            } else {
                Err(meta.error("unsupported wgsl attribute, expected `name = \"...\"`"))
            }
        });
        if let Err(err) = parsed {
            return err.to_compile_error().into();
        }
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => panic!("UniformBlock derive only supports structs with named fields"),
        },
        _ => panic!("UniformBlock derive only supports structs"),
    };

    let mut layout = Layout::default();

    for field in fields.iter() {
        let field_name = field
            .ident
            .as_ref()
            .expect("named fields always carry an identifier");
        let type_info = rust_type_info(&field.ty);

        layout.align_to(type_info.align);

        layout
            .wgsl_fields
            .push(format!("    {}: {},", field_name, type_info.wgsl_type));
        let gpu_field_type = type_info.gpu_type;
        layout.gpu_fields.push(quote! { #field_name: #gpu_field_type });
        let conversion = generate_conversion(field_name, &field.ty);
        layout.conversions.push(quote! { #field_name: #conversion });

        layout.offset += type_info.size;
    }

    // Uniform blocks are bound whole, keep them a multiple of vec4
    layout.align_to(16);

    let size = layout.offset as u64;
    let wgsl_struct = format!(
        "struct {} {{\n{}\n}};",
        wgsl_name,
        layout.wgsl_fields.join("\n")
    );
    let gpu_fields = &layout.gpu_fields;
    let conversions = &layout.conversions;

    let expanded = quote! {
        #[repr(C)]
        #[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
        #vis struct #gpu_name {
            #(pub #gpu_fields),*
        }

        impl rtps::UniformBlock for #name {
            type Gpu = #gpu_name;

            const WGSL_NAME: &'static str = #wgsl_name;
            const WGSL_STRUCT: &'static str = #wgsl_struct;
            const SIZE: u64 = #size;

            fn to_gpu(&self) -> Self::Gpu {
                #gpu_name {
                    #(#conversions),*
                }
            }
        }
    };

    TokenStream::from(expanded)
}

/// Running layout state while walking the struct fields.
#[derive(Default)]
struct Layout {
    offset: u32,
    padding_count: u32,
    wgsl_fields: Vec<String>,
    gpu_fields: Vec<proc_macro2::TokenStream>,
    conversions: Vec<proc_macro2::TokenStream>,
}

impl Layout {
    /// Insert `f32` padding fields until `offset` is a multiple of `align`.
    fn align_to(&mut self, align: u32) {
        let padding_needed = (align - (self.offset % align)) % align;
        for _ in 0..padding_needed / 4 {
            let pad_name_str = format!("_pad{}", self.padding_count);
            let pad_name = Ident::new(&pad_name_str, Span::call_site());
            self.padding_count += 1;

            self.wgsl_fields.push(format!("    {}: f32,", pad_name_str));
            self.gpu_fields.push(quote! { #pad_name: f32 });
            self.conversions.push(quote! { #pad_name: 0.0 });
        }
        self.offset += padding_needed;
    }
}

/// Type metadata for GPU memory layout calculations.
struct TypeInfo {
    /// WGSL type name (e.g., "vec3<f32>")
    wgsl_type: &'static str,
    /// Rust type for the GPU struct (e.g., `[f32; 3]`)
    gpu_type: proc_macro2::TokenStream,
    /// Size in bytes
    size: u32,
    /// Required alignment in bytes
    align: u32,
}

fn type_string(ty: &Type) -> String {
    quote!(#ty).to_string().replace(' ', "")
}

/// Get type information for a Rust type.
fn rust_type_info(ty: &Type) -> TypeInfo {
    let type_str = type_string(ty);

    match type_str.as_str() {
        "Mat4" | "glam::Mat4" => TypeInfo {
            wgsl_type: "mat4x4<f32>",
            gpu_type: quote! { [[f32; 4]; 4] },
            size: 64,
            align: 16,
        },
        "Vec4" | "glam::Vec4" => TypeInfo {
            wgsl_type: "vec4<f32>",
            gpu_type: quote! { [f32; 4] },
            size: 16,
            align: 16,
        },
        "Vec3" | "glam::Vec3" => TypeInfo {
            wgsl_type: "vec3<f32>",
            gpu_type: quote! { [f32; 3] },
            size: 12,
            align: 16, // vec3 has 16-byte alignment in WGSL!
        },
        "Vec2" | "glam::Vec2" => TypeInfo {
            wgsl_type: "vec2<f32>",
            gpu_type: quote! { [f32; 2] },
            size: 8,
            align: 8,
        },
        "f32" => TypeInfo {
            wgsl_type: "f32",
            gpu_type: quote! { f32 },
            size: 4,
            align: 4,
        },
        "u32" => TypeInfo {
            wgsl_type: "u32",
            gpu_type: quote! { u32 },
            size: 4,
            align: 4,
        },
        "i32" => TypeInfo {
            wgsl_type: "i32",
            gpu_type: quote! { i32 },
            size: 4,
            align: 4,
        },
        _ => panic!("Unsupported type in UniformBlock struct: {}", type_str),
    }
}

/// Generate code to convert a field from its glam type to GPU format.
fn generate_conversion(field_name: &Ident, ty: &Type) -> proc_macro2::TokenStream {
    match type_string(ty).as_str() {
        "Mat4" | "glam::Mat4" => quote! { self.#field_name.to_cols_array_2d() },
        "Vec2" | "glam::Vec2" | "Vec3" | "glam::Vec3" | "Vec4" | "glam::Vec4" => {
            quote! { self.#field_name.to_array() }
        }
        _ => quote! { self.#field_name },
    }
}
