//! Prompt text sent to the model

use imlo_ledger::ReceiptVerificationRequest;
use imlo_spelling::SpellingRequest;

/// Uzbek instruction asking for spelling fixes only, with the dictionary sample as context
pub fn spelling_prompt(request: &SpellingRequest) -> String {
    format!(
        "Sen o'zbek tilidagi imlo (ortografiya) tuzatuvchi yordamchisisan. \
         Foydalanuvchi yuborgan matndagi imlo xatolarini tuzatib, faqat to'g'ri yozilgan matnni qaytar. \
         Faqat imlo xatolarini tuzat, matn mazmunini o'zgartirma. To'g'ri yozilgan matnni o'zgartirmaslik kerak. \
         Faqat tuzatilgan matnni qaytar, boshqa izohlar berma. Matnning asl formatini saqlab qol.\n\n\
         Dictionary sample: {}\n\n\
         Misol: \"Asalomu alaykum\" -> \"Assalomu alaykum\"\n\n\
         Tuzatish kerak: \"{}\"",
        request.dictionary_preview, request.original_text
    )
}

pub fn verification_prompt(request: &ReceiptVerificationRequest) -> String {
    format!(
        "You are a payment verification assistant. Check whether the provided receipt shows a \
         completed payment of {amount} {currency} to the card ending with {last4}. \
         Mention the payment code {code} if it's visible.\n\n\
         Receipt image: {image}\n\
         Respond with valid JSON only, using the following schema:\n\
         {{\"valid\": true/false, \"amount\": number, \"currency\": \"string\", \"cardLast4\": \"string\", \
         \"confidence\": number (0-100), \"reason\": \"text\"}}",
        amount = request.expected_amount,
        currency = request.currency,
        last4 = request.card_last4,
        code = request.payment_code,
        image = request.image_reference,
    )
}
