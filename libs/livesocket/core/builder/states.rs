/// Type-state markers for the builder pattern
///
/// These types are used to track which collaborators have been supplied
/// to the builder at compile-time, so `build()` only exists once the client
/// can actually decode, authenticate and publish.

use std::marker::PhantomData;

/// Marker trait for codec + classifier state
pub trait ProtocolState {}

/// Codec and classifier have not been set
pub struct NoProtocol;
impl ProtocolState for NoProtocol {}

/// Codec and classifier have been set
pub struct HasProtocol;
impl ProtocolState for HasProtocol {}

/// Marker trait for token provider + session state
pub trait AuthState {}

/// Token provider has not been set
pub struct NoAuth;
impl AuthState for NoAuth {}

/// Token provider has been set
pub struct HasAuth;
impl AuthState for HasAuth {}

/// Marker trait for publisher state
pub trait PublisherState {}

/// Publisher has not been set
pub struct NoPublisher;
impl PublisherState for NoPublisher {}

/// Publisher has been set
pub struct HasPublisher;
impl PublisherState for HasPublisher {}

/// Phantom marker to prevent direct construction
#[derive(Debug, Clone, Copy)]
pub struct TypeState<P, A, E> {
    _protocol: PhantomData<P>,
    _auth: PhantomData<A>,
    _publisher: PhantomData<E>,
}

impl<P, A, E> TypeState<P, A, E> {
    pub(crate) fn new() -> Self {
        Self {
            _protocol: PhantomData,
            _auth: PhantomData,
            _publisher: PhantomData,
        }
    }
}

impl<P, A, E> Default for TypeState<P, A, E> {
    fn default() -> Self {
        Self::new()
    }
}
