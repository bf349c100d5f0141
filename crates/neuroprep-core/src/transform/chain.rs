//! Ordered transform chains.
//!
//! A registration stage hands back its forward transforms as a
//! [`TransformChain`]. The chain maps points of the fixed (output) grid into
//! the moving image's physical space, link by link in stored order.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use super::affine::AffineTransform;
use super::displacement_field::DisplacementField;
use super::trait_::Transform;
use super::translation::TranslationTransform;

/// One link of a [`TransformChain`].
#[derive(Debug, Clone)]
pub enum ChainLink<B: Backend> {
    Translation(TranslationTransform<B, 3>),
    Affine(AffineTransform<B, 3>),
    DisplacementField(DisplacementField<B>),
}

impl<B: Backend> ChainLink<B> {
    /// Short name used in log output.
    pub fn kind(&self) -> &'static str {
        match self {
            ChainLink::Translation(_) => "translation",
            ChainLink::Affine(_) => "affine",
            ChainLink::DisplacementField(_) => "displacement_field",
        }
    }
}

impl<B: Backend> Transform<B, 3> for ChainLink<B> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        match self {
            ChainLink::Translation(t) => t.transform_points(points),
            ChainLink::Affine(t) => t.transform_points(points),
            ChainLink::DisplacementField(t) => t.transform_points(points),
        }
    }
}

impl<B: Backend> From<TranslationTransform<B, 3>> for ChainLink<B> {
    fn from(t: TranslationTransform<B, 3>) -> Self {
        ChainLink::Translation(t)
    }
}

impl<B: Backend> From<AffineTransform<B, 3>> for ChainLink<B> {
    fn from(t: AffineTransform<B, 3>) -> Self {
        ChainLink::Affine(t)
    }
}

impl<B: Backend> From<DisplacementField<B>> for ChainLink<B> {
    fn from(t: DisplacementField<B>) -> Self {
        ChainLink::DisplacementField(t)
    }
}

/// Ordered sequence of transforms applied together.
///
/// An empty chain is the identity.
#[derive(Debug, Clone)]
pub struct TransformChain<B: Backend> {
    links: Vec<ChainLink<B>>,
}

impl<B: Backend> TransformChain<B> {
    /// Create a chain from links in application order.
    pub fn new(links: Vec<ChainLink<B>>) -> Self {
        Self { links }
    }

    /// The identity chain.
    pub fn identity() -> Self {
        Self { links: Vec::new() }
    }

    /// Append a link; it runs after every link already present.
    pub fn then(mut self, link: impl Into<ChainLink<B>>) -> Self {
        self.links.push(link.into());
        self
    }

    pub fn links(&self) -> &[ChainLink<B>] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl<B: Backend> Default for TransformChain<B> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<B: Backend> Transform<B, 3> for TransformChain<B> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        self.links
            .iter()
            .fold(points, |acc, link| link.transform_points(acc))
    }
}
