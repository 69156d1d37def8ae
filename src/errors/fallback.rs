/// Classification for fallback policy.
///
/// Used to determine how the service responds to errors from providers.
///
/// # Behavior Summary
///
/// | Class | Try Next Provider? | Synthesize? |
/// |-------|-------------------|-------------|
/// | `NextProvider` | Yes | Only after the chain is exhausted |
/// | `Synthetic` | No | Immediately |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FallbackClass {
    /// Try the next provider in the chain.
    ///
    /// Used for rate limits, network failures, schema mismatches, and
    /// unconfigured providers: this provider can't answer right now, but
    /// another one might. When the whole chain is exhausted the service
    /// checks for a stale cache entry and finally synthesizes.
    NextProvider,

    /// Skip the provider chain entirely and generate a synthetic series.
    ///
    /// Used when no provider could possibly answer, e.g. the asset name is
    /// absent from every symbol-mapping table.
    Synthetic,
}
