//! Compile-time generation of the per-contract adapter code.

/// Declare a contract and generate its adapter code.
///
/// One declaration produces the contract marker type with its method
/// descriptor table, a concrete client whose method bodies pack arguments
/// and forward to the matching wire entry point, the handler trait for the
/// inbound direction, and the unpack glue the receiver binder registers.
///
/// Return types are drawn from a fixed vocabulary; anything else fails to
/// expand:
///
/// | declaration                      | call behavior                        |
/// |----------------------------------|--------------------------------------|
/// | `fn m(..);`                      | fire-and-forget, drained in place    |
/// | `async fn m(..);`                | fire-and-forget, completion returned |
/// | `async fn m(..) -> T;`           | request/response                     |
/// | `fn m(..) -> T;`                 | request/response, blocking           |
/// | `fn m(..) -> stream T;`          | server stream                        |
/// | `async fn m(..) -> stream T;`    | server stream behind a completion    |
/// | `fn m(..) -> channel T;`         | push channel, unwrapped in place     |
/// | `async fn m(..) -> channel T;`   | push channel behind a completion     |
///
/// The two fire-and-forget rows accept `#[always_send]` / `#[always_invoke]`
/// to override the registration-wide call-mode policy for that method.
///
/// ```
/// wirecall::contract! {
///     /// A tiny greeting service.
///     pub contract Greeter {
///         client GreeterClient;
///         handler GreeterHandler;
///
///         /// Announce without waiting.
///         fn announce(message: String);
///         #[always_invoke]
///         async fn join(room: String);
///         async fn greet(name: String) -> String;
///         fn countdown(from: i64) -> stream i64;
///     }
/// }
/// ```
#[macro_export]
macro_rules! contract {
    (
        $(#[$cmeta:meta])*
        $vis:vis contract $name:ident {
            client $client:ident;
            handler $handler:ident;
            $($methods:tt)*
        }
    ) => {
        $(#[$cmeta])*
        $vis enum $name {}

        impl $crate::Contract for $name {
            const NAME: &'static str = ::core::stringify!($name);

            fn methods() -> ::std::vec::Vec<$crate::MethodDescriptor> {
                let mut methods = ::std::vec::Vec::new();
                $crate::__contract_methods!(methods; $($methods)*);
                methods
            }
        }

        $vis struct $client {
            core: $crate::ProxyCore,
        }

        impl $crate::Callable for $name {
            type Client = $client;

            fn client(core: $crate::ProxyCore) -> $client {
                $client { core }
            }
        }

        impl $client {
            $crate::__contract_client!($($methods)*);
        }

        $vis trait $handler: ::std::marker::Send + ::std::marker::Sync {
            $crate::__contract_handler!($($methods)*);
        }

        impl $crate::Bindable for $name {
            type Handler = dyn $handler;

            fn inbound(
                handler: ::std::sync::Arc<dyn $handler>,
            ) -> ::std::vec::Vec<$crate::InboundMethod> {
                let _ = &handler;
                let mut inbound = ::std::vec::Vec::new();
                $crate::__contract_inbound!(inbound, handler; $($methods)*);
                inbound
            }
        }
    };
}

/// Descriptor-table arm of `contract!`.
#[doc(hidden)]
#[macro_export]
macro_rules! __contract_methods {
    ($out:ident;) => {};

    // Fire-and-forget, synchronous, with a mode hint.
    ($out:ident; $(#[doc $($doc:tt)*])* #[always_send] fn $m:ident($($p:ident : $pt:ty),* $(,)?); $($rest:tt)*) => {
        $crate::__push_descriptor!($out; $m; ($($p : $pt),*); $crate::ReturnDecl::Unit;
            ::core::option::Option::Some($crate::ModeHint::AlwaysSend));
        $crate::__contract_methods!($out; $($rest)*);
    };
    ($out:ident; $(#[doc $($doc:tt)*])* #[always_invoke] fn $m:ident($($p:ident : $pt:ty),* $(,)?); $($rest:tt)*) => {
        $crate::__push_descriptor!($out; $m; ($($p : $pt),*); $crate::ReturnDecl::Unit;
            ::core::option::Option::Some($crate::ModeHint::AlwaysInvoke));
        $crate::__contract_methods!($out; $($rest)*);
    };
    // Acknowledged fire-and-forget, with a mode hint.
    ($out:ident; $(#[doc $($doc:tt)*])* #[always_send] async fn $m:ident($($p:ident : $pt:ty),* $(,)?); $($rest:tt)*) => {
        $crate::__push_descriptor!($out; $m; ($($p : $pt),*); $crate::ReturnDecl::Completion;
            ::core::option::Option::Some($crate::ModeHint::AlwaysSend));
        $crate::__contract_methods!($out; $($rest)*);
    };
    ($out:ident; $(#[doc $($doc:tt)*])* #[always_invoke] async fn $m:ident($($p:ident : $pt:ty),* $(,)?); $($rest:tt)*) => {
        $crate::__push_descriptor!($out; $m; ($($p : $pt),*); $crate::ReturnDecl::Completion;
            ::core::option::Option::Some($crate::ModeHint::AlwaysInvoke));
        $crate::__contract_methods!($out; $($rest)*);
    };
    // Unhinted fire-and-forget forms.
    ($out:ident; $(#[doc $($doc:tt)*])* fn $m:ident($($p:ident : $pt:ty),* $(,)?); $($rest:tt)*) => {
        $crate::__push_descriptor!($out; $m; ($($p : $pt),*); $crate::ReturnDecl::Unit;
            ::core::option::Option::None);
        $crate::__contract_methods!($out; $($rest)*);
    };
    ($out:ident; $(#[doc $($doc:tt)*])* async fn $m:ident($($p:ident : $pt:ty),* $(,)?); $($rest:tt)*) => {
        $crate::__push_descriptor!($out; $m; ($($p : $pt),*); $crate::ReturnDecl::Completion;
            ::core::option::Option::None);
        $crate::__contract_methods!($out; $($rest)*);
    };
    // Streaming and channel shapes.
    ($out:ident; $(#[doc $($doc:tt)*])* async fn $m:ident($($p:ident : $pt:ty),* $(,)?) -> stream $it:ty; $($rest:tt)*) => {
        $crate::__push_descriptor!($out; $m; ($($p : $pt),*);
            $crate::ReturnDecl::CompletionOf($crate::PayloadDecl::Sequence(<$it as $crate::Typed>::wire_type()));
            ::core::option::Option::None);
        $crate::__contract_methods!($out; $($rest)*);
    };
    ($out:ident; $(#[doc $($doc:tt)*])* async fn $m:ident($($p:ident : $pt:ty),* $(,)?) -> channel $it:ty; $($rest:tt)*) => {
        $crate::__push_descriptor!($out; $m; ($($p : $pt),*);
            $crate::ReturnDecl::CompletionOf($crate::PayloadDecl::Channel(<$it as $crate::Typed>::wire_type()));
            ::core::option::Option::None);
        $crate::__contract_methods!($out; $($rest)*);
    };
    ($out:ident; $(#[doc $($doc:tt)*])* fn $m:ident($($p:ident : $pt:ty),* $(,)?) -> stream $it:ty; $($rest:tt)*) => {
        $crate::__push_descriptor!($out; $m; ($($p : $pt),*);
            $crate::ReturnDecl::Sequence(<$it as $crate::Typed>::wire_type());
            ::core::option::Option::None);
        $crate::__contract_methods!($out; $($rest)*);
    };
    ($out:ident; $(#[doc $($doc:tt)*])* fn $m:ident($($p:ident : $pt:ty),* $(,)?) -> channel $it:ty; $($rest:tt)*) => {
        $crate::__push_descriptor!($out; $m; ($($p : $pt),*);
            $crate::ReturnDecl::Channel(<$it as $crate::Typed>::wire_type());
            ::core::option::Option::None);
        $crate::__contract_methods!($out; $($rest)*);
    };
    // Request/response forms. Kept last so `stream`/`channel` match first.
    ($out:ident; $(#[doc $($doc:tt)*])* async fn $m:ident($($p:ident : $pt:ty),* $(,)?) -> $r:ty; $($rest:tt)*) => {
        $crate::__push_descriptor!($out; $m; ($($p : $pt),*);
            $crate::ReturnDecl::CompletionOf($crate::PayloadDecl::Value(<$r as $crate::Typed>::wire_type()));
            ::core::option::Option::None);
        $crate::__contract_methods!($out; $($rest)*);
    };
    ($out:ident; $(#[doc $($doc:tt)*])* fn $m:ident($($p:ident : $pt:ty),* $(,)?) -> $r:ty; $($rest:tt)*) => {
        $crate::__push_descriptor!($out; $m; ($($p : $pt),*);
            $crate::ReturnDecl::Plain(<$r as $crate::Typed>::wire_type());
            ::core::option::Option::None);
        $crate::__contract_methods!($out; $($rest)*);
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __push_descriptor {
    ($out:ident; $m:ident; ($($p:ident : $pt:ty),*); $returns:expr; $hint:expr) => {
        $out.push($crate::MethodDescriptor {
            name: ::core::stringify!($m),
            params: ::std::vec![$($crate::ParamDescriptor {
                name: ::core::stringify!($p),
                ty: <$pt as $crate::Typed>::wire_type(),
            }),*],
            returns: $returns,
            hint: $hint,
        });
    };
}

/// Client-impl arm of `contract!`. The mode hints shape the plan, not the
/// generated body, so the hinted forms expand like the bare ones.
#[doc(hidden)]
#[macro_export]
macro_rules! __contract_client {
    () => {};

    ($(#[doc $($doc:tt)*])* #[always_send] fn $m:ident($($p:ident : $pt:ty),* $(,)?); $($rest:tt)*) => {
        $crate::__contract_client!($(#[doc $($doc)*])* fn $m($($p : $pt),*); $($rest)*);
    };
    ($(#[doc $($doc:tt)*])* #[always_invoke] fn $m:ident($($p:ident : $pt:ty),* $(,)?); $($rest:tt)*) => {
        $crate::__contract_client!($(#[doc $($doc)*])* fn $m($($p : $pt),*); $($rest)*);
    };
    ($(#[doc $($doc:tt)*])* #[always_send] async fn $m:ident($($p:ident : $pt:ty),* $(,)?); $($rest:tt)*) => {
        $crate::__contract_client!($(#[doc $($doc)*])* async fn $m($($p : $pt),*); $($rest)*);
    };
    ($(#[doc $($doc:tt)*])* #[always_invoke] async fn $m:ident($($p:ident : $pt:ty),* $(,)?); $($rest:tt)*) => {
        $crate::__contract_client!($(#[doc $($doc)*])* async fn $m($($p : $pt),*); $($rest)*);
    };

    ($(#[doc $($doc:tt)*])* fn $m:ident($($p:ident : $pt:ty),* $(,)?); $($rest:tt)*) => {
        $(#[doc $($doc)*])*
        pub fn $m(&self, $($p: $pt),*) -> $crate::CallResult<()> {
            self.core.fire(
                ::core::stringify!($m),
                ::std::vec![$(<$pt as $crate::Encode>::encode($p)),*],
            )
        }
        $crate::__contract_client!($($rest)*);
    };
    ($(#[doc $($doc:tt)*])* async fn $m:ident($($p:ident : $pt:ty),* $(,)?); $($rest:tt)*) => {
        $(#[doc $($doc)*])*
        pub fn $m(&self, $($p: $pt),*) -> $crate::BoxFuture<'static, $crate::CallResult<()>> {
            self.core.ack(
                ::core::stringify!($m),
                ::std::vec![$(<$pt as $crate::Encode>::encode($p)),*],
            )
        }
        $crate::__contract_client!($($rest)*);
    };
    ($(#[doc $($doc:tt)*])* async fn $m:ident($($p:ident : $pt:ty),* $(,)?) -> stream $it:ty; $($rest:tt)*) => {
        $(#[doc $($doc)*])*
        pub fn $m(&self, $($p: $pt),*)
            -> $crate::BoxFuture<'static, $crate::CallResult<$crate::ServerStream<$it>>>
        {
            self.core.stream_deferred::<$it>(
                ::core::stringify!($m),
                ::std::vec![$(<$pt as $crate::Encode>::encode($p)),*],
            )
        }
        $crate::__contract_client!($($rest)*);
    };
    ($(#[doc $($doc:tt)*])* async fn $m:ident($($p:ident : $pt:ty),* $(,)?) -> channel $it:ty; $($rest:tt)*) => {
        $(#[doc $($doc)*])*
        pub fn $m(&self, $($p: $pt),*)
            -> $crate::BoxFuture<'static, $crate::CallResult<$crate::ChannelReader<$it>>>
        {
            self.core.channel_deferred::<$it>(
                ::core::stringify!($m),
                ::std::vec![$(<$pt as $crate::Encode>::encode($p)),*],
            )
        }
        $crate::__contract_client!($($rest)*);
    };
    ($(#[doc $($doc:tt)*])* fn $m:ident($($p:ident : $pt:ty),* $(,)?) -> stream $it:ty; $($rest:tt)*) => {
        $(#[doc $($doc)*])*
        pub fn $m(&self, $($p: $pt),*) -> $crate::ServerStream<$it> {
            self.core.stream::<$it>(
                ::core::stringify!($m),
                ::std::vec![$(<$pt as $crate::Encode>::encode($p)),*],
            )
        }
        $crate::__contract_client!($($rest)*);
    };
    ($(#[doc $($doc:tt)*])* fn $m:ident($($p:ident : $pt:ty),* $(,)?) -> channel $it:ty; $($rest:tt)*) => {
        $(#[doc $($doc)*])*
        pub fn $m(&self, $($p: $pt),*) -> $crate::CallResult<$crate::ChannelReader<$it>> {
            self.core.channel::<$it>(
                ::core::stringify!($m),
                ::std::vec![$(<$pt as $crate::Encode>::encode($p)),*],
            )
        }
        $crate::__contract_client!($($rest)*);
    };
    ($(#[doc $($doc:tt)*])* async fn $m:ident($($p:ident : $pt:ty),* $(,)?) -> $r:ty; $($rest:tt)*) => {
        $(#[doc $($doc)*])*
        pub fn $m(&self, $($p: $pt),*) -> $crate::BoxFuture<'static, $crate::CallResult<$r>> {
            self.core.invoke::<$r>(
                ::core::stringify!($m),
                ::std::vec![$(<$pt as $crate::Encode>::encode($p)),*],
            )
        }
        $crate::__contract_client!($($rest)*);
    };
    ($(#[doc $($doc:tt)*])* fn $m:ident($($p:ident : $pt:ty),* $(,)?) -> $r:ty; $($rest:tt)*) => {
        $(#[doc $($doc)*])*
        pub fn $m(&self, $($p: $pt),*) -> $crate::CallResult<$r> {
            self.core.invoke_blocking::<$r>(
                ::core::stringify!($m),
                ::std::vec![$(<$pt as $crate::Encode>::encode($p)),*],
            )
        }
        $crate::__contract_client!($($rest)*);
    };
}

/// Handler-trait arm of `contract!`: only acknowledged fire-and-forget
/// methods are part of the inbound surface.
#[doc(hidden)]
#[macro_export]
macro_rules! __contract_handler {
    () => {};

    ($(#[doc $($doc:tt)*])* #[always_send] async fn $m:ident($($p:ident : $pt:ty),* $(,)?); $($rest:tt)*) => {
        $crate::__contract_handler!($(#[doc $($doc)*])* async fn $m($($p : $pt),*); $($rest)*);
    };
    ($(#[doc $($doc:tt)*])* #[always_invoke] async fn $m:ident($($p:ident : $pt:ty),* $(,)?); $($rest:tt)*) => {
        $crate::__contract_handler!($(#[doc $($doc)*])* async fn $m($($p : $pt),*); $($rest)*);
    };
    ($(#[doc $($doc:tt)*])* async fn $m:ident($($p:ident : $pt:ty),* $(,)?); $($rest:tt)*) => {
        $(#[doc $($doc)*])*
        fn $m(&self, $($p: $pt),*) -> $crate::BoxFuture<'_, $crate::CallResult<()>>;
        $crate::__contract_handler!($($rest)*);
    };

    // Every other shape is outbound-only.
    ($(#[doc $($doc:tt)*])* #[always_send] fn $m:ident($($p:ident : $pt:ty),* $(,)?); $($rest:tt)*) => {
        $crate::__contract_handler!($($rest)*);
    };
    ($(#[doc $($doc:tt)*])* #[always_invoke] fn $m:ident($($p:ident : $pt:ty),* $(,)?); $($rest:tt)*) => {
        $crate::__contract_handler!($($rest)*);
    };
    ($(#[doc $($doc:tt)*])* fn $m:ident($($p:ident : $pt:ty),* $(,)?); $($rest:tt)*) => {
        $crate::__contract_handler!($($rest)*);
    };
    ($(#[doc $($doc:tt)*])* async fn $m:ident($($p:ident : $pt:ty),* $(,)?) -> stream $it:ty; $($rest:tt)*) => {
        $crate::__contract_handler!($($rest)*);
    };
    ($(#[doc $($doc:tt)*])* async fn $m:ident($($p:ident : $pt:ty),* $(,)?) -> channel $it:ty; $($rest:tt)*) => {
        $crate::__contract_handler!($($rest)*);
    };
    ($(#[doc $($doc:tt)*])* fn $m:ident($($p:ident : $pt:ty),* $(,)?) -> stream $it:ty; $($rest:tt)*) => {
        $crate::__contract_handler!($($rest)*);
    };
    ($(#[doc $($doc:tt)*])* fn $m:ident($($p:ident : $pt:ty),* $(,)?) -> channel $it:ty; $($rest:tt)*) => {
        $crate::__contract_handler!($($rest)*);
    };
    ($(#[doc $($doc:tt)*])* async fn $m:ident($($p:ident : $pt:ty),* $(,)?) -> $r:ty; $($rest:tt)*) => {
        $crate::__contract_handler!($($rest)*);
    };
    ($(#[doc $($doc:tt)*])* fn $m:ident($($p:ident : $pt:ty),* $(,)?) -> $r:ty; $($rest:tt)*) => {
        $crate::__contract_handler!($($rest)*);
    };
}

/// Inbound-glue arm of `contract!`: one unpack closure per handler method.
#[doc(hidden)]
#[macro_export]
macro_rules! __contract_inbound {
    ($out:ident, $handler:ident;) => {};

    ($out:ident, $handler:ident; $(#[doc $($doc:tt)*])* #[always_send] async fn $m:ident($($p:ident : $pt:ty),* $(,)?); $($rest:tt)*) => {
        $crate::__contract_inbound!($out, $handler; async fn $m($($p : $pt),*); $($rest)*);
    };
    ($out:ident, $handler:ident; $(#[doc $($doc:tt)*])* #[always_invoke] async fn $m:ident($($p:ident : $pt:ty),* $(,)?); $($rest:tt)*) => {
        $crate::__contract_inbound!($out, $handler; async fn $m($($p : $pt),*); $($rest)*);
    };
    ($out:ident, $handler:ident; $(#[doc $($doc:tt)*])* async fn $m:ident($($p:ident : $pt:ty),* $(,)?); $($rest:tt)*) => {
        {
            let __handler = ::std::sync::Arc::clone(&$handler);
            let __unpack: $crate::InboundHandler =
                ::std::sync::Arc::new(move |__values: ::std::vec::Vec<$crate::Value>| {
                    let __handler = ::std::sync::Arc::clone(&__handler);
                    let __fut: $crate::BoxFuture<'static, $crate::CallResult<()>> =
                        ::std::boxed::Box::pin(async move {
                            const __ARITY: usize = {
                                let names: &[&str] = &[$(::core::stringify!($p)),*];
                                names.len()
                            };
                            let __args: [$crate::Value; __ARITY] =
                                match <[$crate::Value; __ARITY] as ::core::convert::TryFrom<
                                    ::std::vec::Vec<$crate::Value>,
                                >>::try_from(__values)
                                {
                                    ::core::result::Result::Ok(args) => args,
                                    ::core::result::Result::Err(values) => {
                                        return ::core::result::Result::Err(
                                            $crate::CallError::from($crate::UsageError::ArityMismatch {
                                                method: ::core::stringify!($m),
                                                expected: __ARITY,
                                                given: values.len(),
                                            }),
                                        );
                                    }
                                };
                            let [$($p),*] = __args;
                            $(let $p = <$pt as $crate::Decode>::decode($p)?;)*
                            __handler.$m($($p),*).await
                        });
                    __fut
                });
            $out.push($crate::InboundMethod {
                name: ::core::stringify!($m),
                params: ::std::vec![$(<$pt as $crate::Typed>::wire_type()),*],
                handler: __unpack,
            });
        }
        $crate::__contract_inbound!($out, $handler; $($rest)*);
    };

    // Outbound-only shapes register nothing.
    ($out:ident, $handler:ident; $(#[doc $($doc:tt)*])* #[always_send] fn $m:ident($($p:ident : $pt:ty),* $(,)?); $($rest:tt)*) => {
        $crate::__contract_inbound!($out, $handler; $($rest)*);
    };
    ($out:ident, $handler:ident; $(#[doc $($doc:tt)*])* #[always_invoke] fn $m:ident($($p:ident : $pt:ty),* $(,)?); $($rest:tt)*) => {
        $crate::__contract_inbound!($out, $handler; $($rest)*);
    };
    ($out:ident, $handler:ident; $(#[doc $($doc:tt)*])* fn $m:ident($($p:ident : $pt:ty),* $(,)?); $($rest:tt)*) => {
        $crate::__contract_inbound!($out, $handler; $($rest)*);
    };
    ($out:ident, $handler:ident; $(#[doc $($doc:tt)*])* async fn $m:ident($($p:ident : $pt:ty),* $(,)?) -> stream $it:ty; $($rest:tt)*) => {
        $crate::__contract_inbound!($out, $handler; $($rest)*);
    };
    ($out:ident, $handler:ident; $(#[doc $($doc:tt)*])* async fn $m:ident($($p:ident : $pt:ty),* $(,)?) -> channel $it:ty; $($rest:tt)*) => {
        $crate::__contract_inbound!($out, $handler; $($rest)*);
    };
    ($out:ident, $handler:ident; $(#[doc $($doc:tt)*])* fn $m:ident($($p:ident : $pt:ty),* $(,)?) -> stream $it:ty; $($rest:tt)*) => {
        $crate::__contract_inbound!($out, $handler; $($rest)*);
    };
    ($out:ident, $handler:ident; $(#[doc $($doc:tt)*])* fn $m:ident($($p:ident : $pt:ty),* $(,)?) -> channel $it:ty; $($rest:tt)*) => {
        $crate::__contract_inbound!($out, $handler; $($rest)*);
    };
    ($out:ident, $handler:ident; $(#[doc $($doc:tt)*])* async fn $m:ident($($p:ident : $pt:ty),* $(,)?) -> $r:ty; $($rest:tt)*) => {
        $crate::__contract_inbound!($out, $handler; $($rest)*);
    };
    ($out:ident, $handler:ident; $(#[doc $($doc:tt)*])* fn $m:ident($($p:ident : $pt:ty),* $(,)?) -> $r:ty; $($rest:tt)*) => {
        $crate::__contract_inbound!($out, $handler; $($rest)*);
    };
}
