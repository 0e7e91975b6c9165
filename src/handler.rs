//! Adapters from ordinary Rust functions to type-erased invokers.
//!
//! A function is accepted when every argument is `DeserializeOwned +
//! JsonSchema` and the return value is `Serialize + JsonSchema`. Three
//! flavors exist, selected by the marker type at the call site:
//!
//! - [`Plain`]: `fn(A, B, ..) -> R`
//! - [`Fallible`]: `fn(A, B, ..) -> Result<R, E>`
//! - [`Async`]: `async fn(A, B, ..) -> Result<R, E>`
//!
//! Implementations cover functions of up to eight arguments.

use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use schemars::JsonSchema;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::BoxError;
use crate::types::TypeDescriptor;

/// Type-erased callable: positional JSON arguments in, JSON result out.
pub type Invoker = Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, InvokeError>> + Send + Sync>;

/// Failure of a single invocation, before dispatch maps it to a route error.
#[derive(Debug)]
pub enum InvokeError {
    /// A validated argument still failed to decode into its Rust type.
    Argument {
        index: usize,
        source: serde_json::Error,
    },
    /// The function itself failed.
    Handler(BoxError),
    /// The returned value could not be serialized.
    Encoding(serde_json::Error),
}

/// Marker for functions returning a plain value.
#[derive(Debug)]
pub struct Plain<Args>(PhantomData<fn() -> Args>);

/// Marker for functions returning `Result<T, E>`.
#[derive(Debug)]
pub struct Fallible<Args>(PhantomData<fn() -> Args>);

/// Marker for async functions returning `Result<T, E>`.
#[derive(Debug)]
pub struct Async<Args>(PhantomData<fn() -> Args>);

/// A function that can be registered as a tool.
///
/// `M` is one of [`Plain`], [`Fallible`] or [`Async`] wrapped around the
/// argument tuple; it exists only to keep the implementations apart.
pub trait ToolFn<M>: Send + Sync + Sized + 'static {
    /// Declared argument types, in order.
    fn param_types() -> Vec<TypeDescriptor>;

    /// Declared type of the successful result.
    fn return_type() -> TypeDescriptor;

    fn into_invoker(self) -> Invoker;
}

/// Pulls positional arguments off the validated argument list.
struct ArgReader {
    args: std::vec::IntoIter<Value>,
    index: usize,
}

impl ArgReader {
    fn new(args: Vec<Value>) -> Self {
        Self {
            args: args.into_iter(),
            index: 0,
        }
    }

    fn next<T: DeserializeOwned>(&mut self) -> Result<T, InvokeError> {
        let index = self.index;
        self.index += 1;
        let value = self.args.next().unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|source| InvokeError::Argument { index, source })
    }
}

fn encode<R: Serialize>(value: &R) -> Result<Value, InvokeError> {
    serde_json::to_value(value).map_err(InvokeError::Encoding)
}

macro_rules! impl_tool_fn {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, R, $($ty,)*> ToolFn<Plain<($($ty,)*)>> for F
        where
            F: Fn($($ty,)*) -> R + Send + Sync + 'static,
            R: Serialize + JsonSchema,
            $($ty: DeserializeOwned + JsonSchema,)*
        {
            fn param_types() -> Vec<TypeDescriptor> {
                vec![$(TypeDescriptor::of::<$ty>(),)*]
            }

            fn return_type() -> TypeDescriptor {
                TypeDescriptor::of::<R>()
            }

            fn into_invoker(self) -> Invoker {
                Arc::new(move |args: Vec<Value>| {
                    let mut reader = ArgReader::new(args);
                    let result = (|| {
                        $(let $ty = reader.next::<$ty>()?;)*
                        encode(&(self)($($ty,)*))
                    })();
                    futures::future::ready(result).boxed()
                })
            }
        }

        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, R, E, $($ty,)*> ToolFn<Fallible<($($ty,)*)>> for F
        where
            F: Fn($($ty,)*) -> Result<R, E> + Send + Sync + 'static,
            R: Serialize + JsonSchema,
            E: Into<BoxError>,
            $($ty: DeserializeOwned + JsonSchema,)*
        {
            fn param_types() -> Vec<TypeDescriptor> {
                vec![$(TypeDescriptor::of::<$ty>(),)*]
            }

            fn return_type() -> TypeDescriptor {
                TypeDescriptor::of::<R>()
            }

            fn into_invoker(self) -> Invoker {
                Arc::new(move |args: Vec<Value>| {
                    let mut reader = ArgReader::new(args);
                    let result = (|| {
                        $(let $ty = reader.next::<$ty>()?;)*
                        let value = (self)($($ty,)*).map_err(|e| InvokeError::Handler(e.into()))?;
                        encode(&value)
                    })();
                    futures::future::ready(result).boxed()
                })
            }
        }

        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, Fut, R, E, $($ty,)*> ToolFn<Async<($($ty,)*)>> for F
        where
            F: Fn($($ty,)*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Result<R, E>> + Send + 'static,
            R: Serialize + JsonSchema + 'static,
            E: Into<BoxError> + 'static,
            $($ty: DeserializeOwned + JsonSchema,)*
        {
            fn param_types() -> Vec<TypeDescriptor> {
                vec![$(TypeDescriptor::of::<$ty>(),)*]
            }

            fn return_type() -> TypeDescriptor {
                TypeDescriptor::of::<R>()
            }

            fn into_invoker(self) -> Invoker {
                Arc::new(move |args: Vec<Value>| {
                    let mut reader = ArgReader::new(args);
                    let decoded = (|| Ok::<_, InvokeError>(($(reader.next::<$ty>()?,)*)))();
                    match decoded {
                        Ok(($($ty,)*)) => {
                            let future = (self)($($ty,)*);
                            async move {
                                let value = future.await.map_err(|e| InvokeError::Handler(e.into()))?;
                                encode(&value)
                            }
                            .boxed()
                        }
                        Err(err) => futures::future::ready(Err(err)).boxed(),
                    }
                })
            }
        }
    };
}

impl_tool_fn!();
impl_tool_fn!(T1);
impl_tool_fn!(T1, T2);
impl_tool_fn!(T1, T2, T3);
impl_tool_fn!(T1, T2, T3, T4);
impl_tool_fn!(T1, T2, T3, T4, T5);
impl_tool_fn!(T1, T2, T3, T4, T5, T6);
impl_tool_fn!(T1, T2, T3, T4, T5, T6, T7);
impl_tool_fn!(T1, T2, T3, T4, T5, T6, T7, T8);

/// Wrap a JSON-in/JSON-out function whose types are declared separately.
pub(crate) fn dynamic_invoker<F, E>(handler: F) -> Invoker
where
    F: Fn(Vec<Value>) -> Result<Value, E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    Arc::new(move |args: Vec<Value>| {
        let result = handler(args).map_err(|e| InvokeError::Handler(e.into()));
        futures::future::ready(result).boxed()
    })
}
