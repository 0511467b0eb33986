//! Filter operators and the per-type operator table.
//!
//! Every column type owns a fixed operator list. Each operator knows whether
//! it targets a single value or many, which operator it turns into when the
//! value count crosses the 1 ↔ many boundary, and its negation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::ColumnDataType;

/// Every operator understood by the engine, across all column types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "does not contain")]
    DoesNotContain,
    #[serde(rename = "is")]
    Is,
    #[serde(rename = "is not")]
    IsNot,
    #[serde(rename = "is any of")]
    IsAnyOf,
    #[serde(rename = "is none of")]
    IsNoneOf,
    #[serde(rename = "include")]
    Include,
    #[serde(rename = "exclude")]
    Exclude,
    #[serde(rename = "include any of")]
    IncludeAnyOf,
    #[serde(rename = "include all of")]
    IncludeAllOf,
    #[serde(rename = "exclude if any of")]
    ExcludeIfAnyOf,
    #[serde(rename = "exclude if all")]
    ExcludeIfAll,
    #[serde(rename = "is before")]
    IsBefore,
    #[serde(rename = "is on or after")]
    IsOnOrAfter,
    #[serde(rename = "is after")]
    IsAfter,
    #[serde(rename = "is on or before")]
    IsOnOrBefore,
    #[serde(rename = "is less than")]
    IsLessThan,
    #[serde(rename = "is greater than or equal to")]
    IsGreaterThanOrEqualTo,
    #[serde(rename = "is greater than")]
    IsGreaterThan,
    #[serde(rename = "is less than or equal to")]
    IsLessThanOrEqualTo,
    #[serde(rename = "is between")]
    IsBetween,
    #[serde(rename = "is not between")]
    IsNotBetween,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Contains => "contains",
            FilterOperator::DoesNotContain => "does not contain",
            FilterOperator::Is => "is",
            FilterOperator::IsNot => "is not",
            FilterOperator::IsAnyOf => "is any of",
            FilterOperator::IsNoneOf => "is none of",
            FilterOperator::Include => "include",
            FilterOperator::Exclude => "exclude",
            FilterOperator::IncludeAnyOf => "include any of",
            FilterOperator::IncludeAllOf => "include all of",
            FilterOperator::ExcludeIfAnyOf => "exclude if any of",
            FilterOperator::ExcludeIfAll => "exclude if all",
            FilterOperator::IsBefore => "is before",
            FilterOperator::IsOnOrAfter => "is on or after",
            FilterOperator::IsAfter => "is after",
            FilterOperator::IsOnOrBefore => "is on or before",
            FilterOperator::IsLessThan => "is less than",
            FilterOperator::IsGreaterThanOrEqualTo => "is greater than or equal to",
            FilterOperator::IsGreaterThan => "is greater than",
            FilterOperator::IsLessThanOrEqualTo => "is less than or equal to",
            FilterOperator::IsBetween => "is between",
            FilterOperator::IsNotBetween => "is not between",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How many values an operator expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorTarget {
    Single,
    Multiple,
}

/// Static facts about one operator within one column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorDetails {
    pub operator: FilterOperator,
    pub target: OperatorTarget,
    /// Replacement when the value count grows past one.
    pub plural: Option<FilterOperator>,
    /// Replacement when the value count drops to one or zero.
    pub singular: Option<FilterOperator>,
    pub is_negated: bool,
    pub negation: Option<FilterOperator>,
}

const fn details(
    operator: FilterOperator,
    target: OperatorTarget,
    plural: Option<FilterOperator>,
    singular: Option<FilterOperator>,
    is_negated: bool,
    negation: Option<FilterOperator>,
) -> OperatorDetails {
    OperatorDetails {
        operator,
        target,
        plural,
        singular,
        is_negated,
        negation,
    }
}

use FilterOperator as Op;
use OperatorTarget::{Multiple, Single};

const TEXT_OPERATORS: &[OperatorDetails] = &[
    details(Op::Contains, Single, None, None, false, Some(Op::DoesNotContain)),
    details(Op::DoesNotContain, Single, None, None, true, Some(Op::Contains)),
];

const NUMBER_OPERATORS: &[OperatorDetails] = &[
    details(Op::Is, Single, Some(Op::IsBetween), None, false, Some(Op::IsNot)),
    details(Op::IsNot, Single, Some(Op::IsNotBetween), None, true, Some(Op::Is)),
    details(Op::IsLessThan, Single, None, None, false, Some(Op::IsGreaterThanOrEqualTo)),
    details(Op::IsGreaterThanOrEqualTo, Single, None, None, true, Some(Op::IsLessThan)),
    details(Op::IsGreaterThan, Single, None, None, false, Some(Op::IsLessThanOrEqualTo)),
    details(Op::IsLessThanOrEqualTo, Single, None, None, true, Some(Op::IsGreaterThan)),
    details(Op::IsBetween, Multiple, None, Some(Op::Is), false, Some(Op::IsNotBetween)),
    details(Op::IsNotBetween, Multiple, None, Some(Op::IsNot), true, Some(Op::IsBetween)),
];

const DATE_OPERATORS: &[OperatorDetails] = &[
    details(Op::Is, Single, Some(Op::IsBetween), None, false, Some(Op::IsNot)),
    details(Op::IsNot, Single, Some(Op::IsNotBetween), None, true, Some(Op::Is)),
    details(Op::IsBefore, Single, None, None, false, Some(Op::IsOnOrAfter)),
    details(Op::IsOnOrAfter, Single, None, None, true, Some(Op::IsBefore)),
    details(Op::IsAfter, Single, None, None, false, Some(Op::IsOnOrBefore)),
    details(Op::IsOnOrBefore, Single, None, None, true, Some(Op::IsAfter)),
    details(Op::IsBetween, Multiple, None, Some(Op::Is), false, Some(Op::IsNotBetween)),
    details(Op::IsNotBetween, Multiple, None, Some(Op::IsNot), true, Some(Op::IsBetween)),
];

const OPTION_OPERATORS: &[OperatorDetails] = &[
    details(Op::Is, Single, Some(Op::IsAnyOf), None, false, Some(Op::IsNot)),
    details(Op::IsNot, Single, Some(Op::IsNoneOf), None, true, Some(Op::Is)),
    details(Op::IsAnyOf, Multiple, None, Some(Op::Is), false, Some(Op::IsNoneOf)),
    details(Op::IsNoneOf, Multiple, None, Some(Op::IsNot), true, Some(Op::IsAnyOf)),
];

const MULTI_OPTION_OPERATORS: &[OperatorDetails] = &[
    details(Op::Include, Single, Some(Op::IncludeAnyOf), None, false, Some(Op::Exclude)),
    details(Op::Exclude, Single, Some(Op::ExcludeIfAnyOf), None, true, Some(Op::Include)),
    details(Op::IncludeAnyOf, Multiple, None, Some(Op::Include), false, Some(Op::ExcludeIfAnyOf)),
    details(Op::IncludeAllOf, Multiple, None, Some(Op::Include), false, Some(Op::ExcludeIfAll)),
    details(Op::ExcludeIfAnyOf, Multiple, None, Some(Op::Exclude), true, Some(Op::IncludeAnyOf)),
    details(Op::ExcludeIfAll, Multiple, None, Some(Op::Exclude), true, Some(Op::IncludeAllOf)),
];

impl ColumnDataType {
    /// The operator table for this column type, in display order.
    pub fn operators(&self) -> &'static [OperatorDetails] {
        match self {
            ColumnDataType::Text => TEXT_OPERATORS,
            ColumnDataType::Number => NUMBER_OPERATORS,
            ColumnDataType::Date => DATE_OPERATORS,
            ColumnDataType::Option => OPTION_OPERATORS,
            ColumnDataType::MultiOption => MULTI_OPTION_OPERATORS,
        }
    }

    pub fn operator_details(&self, operator: FilterOperator) -> Option<&'static OperatorDetails> {
        self.operators().iter().find(|d| d.operator == operator)
    }

    pub fn supports(&self, operator: FilterOperator) -> bool {
        self.operator_details(operator).is_some()
    }

    /// Operator given to a new filter of this type.
    pub fn default_operator(&self, target: OperatorTarget) -> FilterOperator {
        match (self, target) {
            (ColumnDataType::Text, _) => Op::Contains,
            (ColumnDataType::Number | ColumnDataType::Date, Single) => Op::Is,
            (ColumnDataType::Number | ColumnDataType::Date, Multiple) => Op::IsBetween,
            (ColumnDataType::Option, Single) => Op::Is,
            (ColumnDataType::Option, Multiple) => Op::IsAnyOf,
            (ColumnDataType::MultiOption, Single) => Op::Include,
            (ColumnDataType::MultiOption, Multiple) => Op::IncludeAnyOf,
        }
    }

    /// Default operator for a new filter holding `count` values.
    pub fn default_operator_for(&self, count: usize) -> FilterOperator {
        if count > 1 {
            self.default_operator(Multiple)
        } else {
            self.default_operator(Single)
        }
    }
}

/// Pick the operator after a filter's values change from `old_count` to
/// `new_count` entries.
///
/// The operator only moves when the count crosses the 1 ↔ many boundary, and
/// only if the current operator has a counterpart on the other side.
pub fn determine_new_operator(
    data_type: ColumnDataType,
    old_count: usize,
    new_count: usize,
    current: FilterOperator,
) -> FilterOperator {
    if old_count == new_count
        || (old_count >= 2 && new_count >= 2)
        || (old_count <= 1 && new_count <= 1)
    {
        return current;
    }

    let Some(details) = data_type.operator_details(current) else {
        return current;
    };

    if old_count < new_count {
        details.plural.unwrap_or(current)
    } else {
        details.singular.unwrap_or(current)
    }
}
