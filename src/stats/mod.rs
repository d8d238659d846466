//! Statistics over the analysis table.
//!
//! Every aggregate here works on defined values only. Single-column
//! statistics drop undefined cells; multi-column ones (correlation matrix,
//! regression) drop the whole row when any involved column is undefined.
//! Both report how many values or rows were left out.

pub mod correlation;
pub mod describe;
pub mod district;
pub mod hypothesis;
pub mod rank;
pub mod regression;

pub use correlation::{correlation_matrix, pearson, CorrelationMatrix};
pub use describe::{describe, describe_columns, quantile, Summary};
pub use district::{district_summary, DistrictSummary};
pub use hypothesis::{check_hypotheses, Hypothesis, HypothesisCheck, Sign};
pub use rank::{bottom_k, top_k, Ranked};
pub use regression::{fit_ols, OlsFit};
