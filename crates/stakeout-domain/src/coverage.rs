//! Mandated evidence domains for completeness checking

/// Evidence domain a report must cover
///
/// The completeness gate requires every domain to carry at least one citation
/// or an explicit Unknown marker before a run can be considered final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EvidenceDomain {
    /// Who is behind the asset
    Identity,
    /// The candidate contract address under investigation
    CandidateAddress,
    /// Transfers and trades
    OnChainActivity,
    /// Liquidity and holder distribution
    LiquidityHoldings,
    /// Project website / DNS records
    Website,
    /// Social media presence
    Social,
    /// Contradiction review
    Contradictions,
}

impl EvidenceDomain {
    /// All mandated domains, report order
    pub const ALL: [EvidenceDomain; 7] = [
        EvidenceDomain::Identity,
        EvidenceDomain::CandidateAddress,
        EvidenceDomain::OnChainActivity,
        EvidenceDomain::LiquidityHoldings,
        EvidenceDomain::Website,
        EvidenceDomain::Social,
        EvidenceDomain::Contradictions,
    ];

    /// Get the domain name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceDomain::Identity => "identity",
            EvidenceDomain::CandidateAddress => "candidate_address",
            EvidenceDomain::OnChainActivity => "on_chain_activity",
            EvidenceDomain::LiquidityHoldings => "liquidity_holdings",
            EvidenceDomain::Website => "website",
            EvidenceDomain::Social => "social",
            EvidenceDomain::Contradictions => "contradictions",
        }
    }

    /// Parse a domain from a string (internal use)
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_domains_parse_roundtrip() {
        for domain in EvidenceDomain::ALL {
            assert_eq!(EvidenceDomain::parse(domain.as_str()), Some(domain));
        }
        assert_eq!(EvidenceDomain::parse("nonsense"), None);
    }
}
