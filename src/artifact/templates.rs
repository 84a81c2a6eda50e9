//! Playwright spec templates.
//!
//! Templates are written as blank-line separated blocks and then passed
//! through step instrumentation, so every generated test is a sequence of
//! named steps.

use super::steps::instrument_steps;
use crate::util::escape_single_quotes;

const FIXTURE_IMPORT: &str = "../../fixtures/app.fixture";

fn render(describe: &str, tag: &str, title: &str, fixtures: &str, body: &[&[String]]) -> String {
    let blocks: Vec<String> = body
        .iter()
        .map(|block| {
            block
                .iter()
                .map(|line| format!("    {line}"))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect();

    let plain = format!(
        "import {{ test }} from '{FIXTURE_IMPORT}';\n\
         \n\
         test.describe('{describe}', {{ tag: '{tag}' }}, () => {{\n  \
         test('{title}', {{ tag: '@regression' }}, async ({{ {fixtures} }}) => {{\n\
         {blocks}\n  \
         }});\n\
         }});\n",
        title = escape_single_quotes(title),
        blocks = blocks.join("\n\n"),
    );
    instrument_steps(&plain)
}

/// Product details test for a catalog product, addressed by key.
pub fn inventory_by_key(test_title: &str, product_key: &str) -> String {
    let key = escape_single_quotes(product_key);
    render(
        "Product Inventory Tests",
        "@inventory",
        test_title,
        "authenticatedPage: _authenticatedPage, inventoryPage",
        &[
            &["await inventoryPage.assertOnInventoryPage();".to_string()],
            &[format!(
                "await inventoryPage.assertProductCardTitleDescriptionAndImageFor('{key}');"
            )],
        ],
    )
}

/// Product details test for a product missing from the catalog, addressed by name.
pub fn inventory_by_name(test_title: &str, product_name: &str) -> String {
    let name = escape_single_quotes(product_name);
    render(
        "Product Inventory Tests",
        "@inventory",
        test_title,
        "authenticatedPage: _authenticatedPage, inventoryPage",
        &[
            &["await inventoryPage.assertOnInventoryPage();".to_string()],
            &[format!(
                "await inventoryPage.assertProductCardTitleDescriptionAndImageByName('{name}');"
            )],
        ],
    )
}

/// Add two products, check the cart, then check the checkout totals.
pub fn cart_two_products(key_one: &str, key_two: &str) -> String {
    let a = escape_single_quotes(key_one);
    let b = escape_single_quotes(key_two);
    render(
        "Shopping Cart Tests",
        "@cart",
        "Cart Two Products Validation",
        "authenticatedPage: _authenticatedPage, inventoryPage, cartPage, checkoutPage",
        &[
            &[
                "await inventoryPage.assertOnInventoryPage();".to_string(),
                format!("await inventoryPage.assertProductCardDetailsFor('{a}');"),
                format!("await inventoryPage.assertProductCardDetailsFor('{b}');"),
            ],
            &[
                format!("await inventoryPage.addProductToCartByKey('{a}');"),
                format!("await inventoryPage.addProductToCartByKey('{b}');"),
                "await inventoryPage.assertCartBadgeCount(2);".to_string(),
            ],
            &[
                "await inventoryPage.goToCart();".to_string(),
                "await cartPage.assertOnCartPage();".to_string(),
                "await cartPage.assertCartItemCount(2);".to_string(),
                format!("await cartPage.assertProductDetailsInCartByKey('{a}');"),
                format!("await cartPage.assertProductDetailsInCartByKey('{b}');"),
            ],
            &[
                "await cartPage.proceedToCheckout();".to_string(),
                "await checkoutPage.assertOnCheckoutInfoPage();".to_string(),
                "await checkoutPage.fillCheckoutInformationFromProfile('valid');".to_string(),
                "await checkoutPage.clickContinue();".to_string(),
            ],
            &[
                "await checkoutPage.assertOnCheckoutOverviewPage();".to_string(),
                format!("await checkoutPage.assertProductInOverviewByKey('{a}');"),
                format!("await checkoutPage.assertProductInOverviewByKey('{b}');"),
                format!("await checkoutPage.assertSubtotalEqualsProductSum(['{a}', '{b}']);"),
                "await checkoutPage.assertTotalEqualsSubtotalPlusTax();".to_string(),
            ],
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_template_by_key() {
        let content = inventory_by_key("Onesie Product Details", "onesie");
        assert!(content.starts_with("import { test } from '../../fixtures/app.fixture';\n\n"));
        assert!(content.contains("test.describe('Product Inventory Tests', { tag: '@inventory' }, () => {"));
        assert!(content.contains("test('Onesie Product Details', { tag: '@regression' }"));
        assert!(content.contains("await test.step('Step 1: Assert On Inventory Page', async () => {"));
        assert!(content.contains(
            "await test.step('Step 2: Assert Product Card Title Description And Image For', async () => {\n      await inventoryPage.assertProductCardTitleDescriptionAndImageFor('onesie');"
        ));
    }

    #[test]
    fn inventory_template_by_name_escapes_quotes() {
        let content = inventory_by_name("Bob's Hat Product Details", "Sauce Labs Bob's Hat");
        assert!(content.contains("test('Bob\\'s Hat Product Details'"));
        assert!(content.contains("ImageByName('Sauce Labs Bob\\'s Hat')"));
    }

    #[test]
    fn cart_template_has_five_steps() {
        let content = cart_two_products("backpack", "fleeceJacket");
        assert_eq!(content.matches("await test.step(").count(), 5);
        assert!(content.contains("Step 4: Proceed To Checkout"));
        assert!(content.contains("assertSubtotalEqualsProductSum(['backpack', 'fleeceJacket'])"));
        assert!(content.ends_with("    });\n  });\n});\n"));
    }
}
