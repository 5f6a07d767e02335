//! The embedded prompt library.
//!
//! Constructed once at bootstrap and injected wherever prompt text is
//! needed; no module-level caches. Templates use `{{name}}` placeholders
//! filled by `render`.

/// Prompt templates for the agent loop and each tool.
#[derive(Clone, Debug, Default)]
pub struct PromptLibrary;

impl PromptLibrary {
    pub fn new() -> Self {
        Self
    }

    pub fn system_prompt(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    pub fn user_turn(&self, user_request: &str) -> String {
        render(USER_TURN_TEMPLATE, &[("user_request", user_request)])
    }

    pub fn classify_intent(&self, user_request: &str) -> String {
        render(CLASSIFY_INTENT_TEMPLATE, &[("user_request", user_request)])
    }

    pub fn validate_product(&self, user_request: &str) -> String {
        render(VALIDATE_PRODUCT_TEMPLATE, &[("user_request", user_request)])
    }

    pub fn extract_details(&self, user_request: &str, catalog_listing: &str) -> String {
        render(
            EXTRACT_DETAILS_TEMPLATE,
            &[("user_request", user_request), ("catalog_listing", catalog_listing)],
        )
    }

    pub fn check_compliance(
        &self,
        category: &str,
        sku: &str,
        quantity: &str,
        unit_cost: &str,
        department: &str,
    ) -> String {
        render(
            CHECK_COMPLIANCE_TEMPLATE,
            &[
                ("category", category),
                ("sku", sku),
                ("quantity", quantity),
                ("unit_cost", unit_cost),
                ("department", department),
            ],
        )
    }

    pub fn justify_approval(&self, justification: &str, item: &str, cost: &str) -> String {
        render(
            JUSTIFY_APPROVAL_TEMPLATE,
            &[("justification", justification), ("item", item), ("cost", cost)],
        )
    }
}

fn render(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut rendered = template.to_string();
    for (name, value) in substitutions {
        rendered = rendered.replace(&format!("{{{{{name}}}}}"), value);
    }
    rendered
}

const SYSTEM_PROMPT: &str = r#"You are a goal-driven, autonomous procurement agent.
Your primary purpose is to manage employee purchase order requests from start to finish by making intelligent, sequential use of the tools provided.

Tools

You may use the following tools:

  1. ClassifyIntent - Classifies an employee's request into a specific category: Request product, Show supported products, show product specs, show procurement policies.
  2. ValidateProduct - Acts as a gatekeeper for the 'Request product' workflow to confirm the requested item is a workplace computer.
  3. ExtractDetails - Extracts specific details like model, quantity, SKUs from a validated purchase request.
  4. CheckCompliance - Reviews the request against all applicable procurement policies.
  5. JustifyApproval - Evaluates the justification for hardware purchases that violate compliance rules.

Core Principles:

  - Reflect and Plan: After each tool use, reflect on the result and adjust your plan to achieve the goal.
  - Reason Step-by-Step: Your internal monologue must show your reasoning for choosing each next action.
  - Do Not Guess: If information is missing or a step fails, use your tools to get the information or stop and ask for human approval.
  - Expect Structured JSON: All tools return their results in a structured JSON format. Your next action must be based on the key-value data contained within this JSON output.

Workflow Rules:

  - Confidence Score Check: If ClassifyIntent returns a confidence score below 0.8, you must stop all other actions. Immediately ask the user for clarification about their request.
  - Purchase Request Validation: If ClassifyIntent identifies the intent as 'RequestPurchase', the ONLY available tool for your next step is ValidateProduct. You are forbidden from using any other tool, including ExtractDetails, until ValidateProduct has been successfully executed.
  - Policy Tool Usage: CheckCompliance can and should be used even if some request information is incomplete. It will determine which policies are applicable based on the available data.
"#;

const USER_TURN_TEMPLATE: &str = r#"A new purchase order request has been submitted.

Request Details:
{{user_request}}

Your task is to process this request using the available tools.
At each step, select and invoke the tool most appropriate for the current context, and reflect on the output before proceeding.
Continue until the purchase order is ready for submission, or stop if the request is invalid, non-compliant, or requires escalation.

At the end of each interaction, respond ONLY with a valid JSON object containing these fields:

{
  "reflection": "(Briefly explain your reasoning or the result for this step.)",
  "nextStep": "(What should the agent or user do next? E.g., ask for clarification, proceed to approval, etc.)",
  "userPrompt": "(The exact question or instruction for the user. No extra text.)",
  "products": (If the user must select from a list of products, or if showing available products is helpful, include a JSON array of product objects here. Otherwise, omit this property.)
}

Do NOT include any text outside the JSON object.
"#;

const CLASSIFY_INTENT_TEMPLATE: &str = r#"You are a highly specialized AI assistant for a corporate purchasing system.
Your only task is to analyze the user's input and classify their primary intent.

User input: {{user_request}}

### Intents
 - **RequestPurchase**: The user wants to buy or order a new item.
 - **ShowSupportedProducts**: The user is asking for a list of available products.
 - **ShowSpecs**: The user is asking for the technical specifications of a specific product.
 - **ShowComplianceRules**: The user is asking about the company's purchasing policy.
 - **Other**: Something that is not relevant for this application. Set confidence to 0.0.

- confidence: A float value between 0.0 and 1.0 indicating how confident you are in the classification.

### JSON Output
Return STRICTLY valid JSON with the following structure:
{
  "intent": "One of the intents listed above",
  "confidence": 0.0
}

### Examples

**User Input**: "I need to order a new laptop for a new hire"
**JSON Output**:
{
  "intent": "RequestPurchase",
  "confidence": 0.98
}

**User Input**: "What are the specs for the MBP-16-M3?"
**JSON Output**:
{
  "intent": "ShowSpecs",
  "confidence": 0.99
}

**User Input**: "Show me the products that are available"
**JSON Output**:
{
  "intent": "ShowSupportedProducts",
  "confidence": 0.95
}
"#;

const VALIDATE_PRODUCT_TEMPLATE: &str = r#"You are a validation gate for a corporate purchasing workflow.
Decide whether the item below is a workplace computer (laptop, 2-in-1, or business tablet) that this system may procure.
Peripherals, phones, servers, software, and anything that is not a personal workplace computer are out of scope.

Requested item: {{user_request}}

Return STRICTLY valid JSON:
{
  "is_workplace_computer": true or false,
  "confidence": 0.0,
  "validation_method": "brief note on how you decided"
}
"#;

const EXTRACT_DETAILS_TEMPLATE: &str = r#"Extract order details from the user's purchase request.

Supported products (sku: name):
{{catalog_listing}}

User request: {{user_request}}

Identify the requested product(s) AND extract order details.

Return STRICTLY valid JSON with these fields:
{
  "status": "matched" | "ambiguous" | "not_found",
  "sku": ["array of matching SKUs only"],
  "department": "extracted department name or null",
  "quantity": number (default 1),
  "confidence": float between 0 and 1
}

Decision rules:
- If the request matches exactly one product: status = "matched"
- If the request could refer to more than one product: status = "ambiguous"
- If no product is found: status = "not_found"
- Always return sku as an array, even for single matches
"#;

const CHECK_COMPLIANCE_TEMPLATE: &str = r#"You are a compliance reasoning agent responsible for determining whether a purchase request follows company procurement policies.

### Procurement Policy:

1. Hardware purchases must not exceed $1000 per unit.
2. Hardware requests over 10 units require department head approval.
3. Laptop requests are limited to one per employee every 3 years.
4. Desktop computers are not allowed for employees.
5. Hardware upgrades must be justified by age (minimum 36-month lifecycle).
6. Only pre-approved vendors may be used for laptops, desktops, and servers.
7. Any single requisition exceeding $50,000 must be routed to Finance VP for approval.
8. Bulk orders over 25 units must include supplier discount verification.
9. Any purchase tagged as "urgent" will trigger a post-purchase audit.

---REQUEST---
Category: {{category}}
Sku: {{sku}}
Quantity: {{quantity}}
Unit cost: {{unit_cost}}
Department: {{department}}

Return STRICTLY valid JSON:
{
  "compliant": true or false,
  "violations": ["each violated policy, in plain language"],
  "applicablePolicies": ["policy numbers that applied to this request"]
}
"#;

const JUSTIFY_APPROVAL_TEMPLATE: &str = r#"You are an intelligent procurement approval agent responsible for evaluating justifications for hardware purchases that exceed the standard $1000 limit.

### Request Details:
Item: {{item}}
Cost: {{cost}}
User Justification: {{justification}}

### Evaluation Criteria:
APPROVE if the justification demonstrates:
- Specific technical requirements (development, design, video editing, data analysis)
- Performance needs that require premium hardware
- Business-critical use cases
- Clear productivity or efficiency benefits

DENY if the justification is:
- Vague or generic ("I want a better laptop")
- Based on preference rather than need
- Missing concrete business impact

Return STRICTLY valid JSON:
{
  "approved": true or false,
  "reason": "the decisive factor in one sentence",
  "message": "optional guidance for the requester",
  "suggestions": ["optional improvements when denied"]
}
"#;
