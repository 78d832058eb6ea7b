//! Helper macro for declaring port error enums.
//!
//! Each variant gets a snake_case constructor whose fields accept anything
//! convertible into the declared type, so adapters can write
//! `RecordStoreError::connection(err.to_string())`.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        define_port_error!(@ctor_impl $variant () () $( $field : $ty, )*);
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) ) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_port_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    define_port_error! {
        pub enum SampleError {
            Closed => "registry closed",
            Rejected { message: String } => "rejected: {message}",
            Throttled { message: String, retry_after_secs: u64 } =>
                "throttled: {message} (retry after {retry_after_secs}s)",
        }
    }

    #[test]
    fn unit_variants_get_plain_constructors() {
        assert_eq!(SampleError::closed(), SampleError::Closed);
        assert_eq!(SampleError::closed().to_string(), "registry closed");
    }

    #[test]
    fn string_fields_accept_str() {
        let err = SampleError::rejected("chat not found");
        assert_eq!(err.to_string(), "rejected: chat not found");
    }

    #[test]
    fn mixed_fields_keep_their_types() {
        let err = SampleError::throttled("too many requests", 30_u64);
        assert_eq!(
            err.to_string(),
            "throttled: too many requests (retry after 30s)"
        );
    }
}
