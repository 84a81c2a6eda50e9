//! GraphQL documents for the GitHub Projects v2 API.
//!
//! Owners can be users or organizations, so project lookups repeat the same
//! selection under both `repositoryOwner` fragments.

/// Project id, fields and up to 100 items with their status values.
pub const PROJECT_ITEMS_QUERY: &str = r#"
query($owner:String!, $number:Int!) {
  repositoryOwner(login:$owner) {
    ... on User {
      projectV2(number:$number) {
        id
        title
        fields(first:100) {
          nodes {
            ... on ProjectV2FieldCommon { id name }
            ... on ProjectV2SingleSelectField { id name options { id name } }
          }
        }
        items(first:100) {
          nodes {
            id
            content {
              __typename
              ... on Issue { id number title body url repository { nameWithOwner } labels(first:30) { nodes { name } } }
              ... on PullRequest { id number title body url repository { nameWithOwner } labels(first:30) { nodes { name } } }
              ... on DraftIssue { id title body }
            }
            fieldValues(first:20) {
              nodes {
                ... on ProjectV2ItemFieldSingleSelectValue { name optionId field { ... on ProjectV2FieldCommon { name } } }
              }
            }
          }
        }
      }
    }
    ... on Organization {
      projectV2(number:$number) {
        id
        title
        fields(first:100) {
          nodes {
            ... on ProjectV2FieldCommon { id name }
            ... on ProjectV2SingleSelectField { id name options { id name } }
          }
        }
        items(first:100) {
          nodes {
            id
            content {
              __typename
              ... on Issue { id number title body url repository { nameWithOwner } labels(first:30) { nodes { name } } }
              ... on PullRequest { id number title body url repository { nameWithOwner } labels(first:30) { nodes { name } } }
              ... on DraftIssue { id title body }
            }
            fieldValues(first:20) {
              nodes {
                ... on ProjectV2ItemFieldSingleSelectValue { name optionId field { ... on ProjectV2FieldCommon { name } } }
              }
            }
          }
        }
      }
    }
  }
}
"#;

/// Project id and fields only, for status moves.
pub const PROJECT_FIELDS_QUERY: &str = r#"
query($owner:String!, $number:Int!) {
  repositoryOwner(login:$owner) {
    ... on User {
      projectV2(number:$number) {
        id
        title
        fields(first:100) {
          nodes {
            ... on ProjectV2FieldCommon { id name }
            ... on ProjectV2SingleSelectField { id name options { id name } }
          }
        }
      }
    }
    ... on Organization {
      projectV2(number:$number) {
        id
        title
        fields(first:100) {
          nodes {
            ... on ProjectV2FieldCommon { id name }
            ... on ProjectV2SingleSelectField { id name options { id name } }
          }
        }
      }
    }
  }
}
"#;

pub const MOVE_ITEM_MUTATION: &str = r#"
mutation($project:ID!, $item:ID!, $field:ID!, $option:String!) {
  updateProjectV2ItemFieldValue(
    input: {
      projectId: $project,
      itemId: $item,
      fieldId: $field,
      value: { singleSelectOptionId: $option }
    }
  ) {
    projectV2Item { id }
  }
}
"#;

pub const CLOSING_ISSUES_QUERY: &str = r#"
query($owner:String!, $repo:String!, $number:Int!) {
  repository(owner:$owner, name:$repo) {
    pullRequest(number:$number) {
      closingIssuesReferences(first:20) {
        nodes {
          number
          repository { nameWithOwner }
        }
      }
    }
  }
}
"#;
